use std::fmt;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::config::CONFIG;
use crate::data_models::{Post, PostsHolder};

// redb has no openDB-style schema version, so it rides in the file name
const DB_VERSION: u8 = 1;

/// Both stores are single-row: everything lives under this one key.
const STORE_KEY: &str = "POSTS";

const POSTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("POSTS");
const STATS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("STATS");

#[derive(Debug, Error)]
pub enum CacheError {
    /// Durable storage is missing or inaccessible. Consumers degrade to
    /// an empty cache rather than fail.
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
    /// The stored posts record did not parse back. A corrupt corpus
    /// cannot be trusted for query correctness, so this is fatal to the
    /// load that hits it.
    #[error("cached posts record is corrupt")]
    Corrupt(#[from] serde_json::Error),
}

fn unavailable(err: impl fmt::Display) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// Persistent replica of the post corpus plus the freshness marker it
/// was fetched with. Backed by a single-file redb database holding the
/// `POSTS` and `STATS` tables; the two records are written together in
/// one transaction, never independently.
///
/// The database handle is opened inside each operation and dropped
/// before returning, so no storage connection is held across the
/// worker's lifetime.
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl AsRef<Path>) -> CacheStore {
        CacheStore {
            path: dir.as_ref().join(format!("blog_store.v{DB_VERSION}.redb")),
        }
    }

    /// Create a CacheStore rooted at the configured cache directory.
    pub fn from_config() -> CacheStore {
        CacheStore::new(&CONFIG.cache_dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached posts and freshness marker. Either may be absent
    /// on first run; a database file that does not exist yet is first
    /// run, not an error.
    pub fn read(&self) -> Result<(Option<Vec<Post>>, Option<String>), CacheError> {
        let db = Database::create(&self.path).map_err(unavailable)?;
        let txn = db.begin_read().map_err(unavailable)?;

        let marker = match txn.open_table(STATS_TABLE) {
            Ok(table) => table
                .get(STORE_KEY)
                .map_err(unavailable)?
                .map(|guard| guard.value().to_string()),
            Err(redb::TableError::TableDoesNotExist(_)) => None,
            Err(err) => return Err(unavailable(err)),
        };

        let posts = match txn.open_table(POSTS_TABLE) {
            Ok(table) => match table.get(STORE_KEY).map_err(unavailable)? {
                Some(guard) => {
                    let holder: PostsHolder = serde_json::from_slice(guard.value())?;
                    Some(holder.posts)
                }
                None => None,
            },
            Err(redb::TableError::TableDoesNotExist(_)) => None,
            Err(err) => return Err(unavailable(err)),
        };

        Ok((posts, marker))
    }

    /// Persist a refreshed corpus. The marker write is skipped when the
    /// refresh carried none, leaving any previous marker in place.
    pub fn write(&self, posts: &[Post], last_modified: Option<&str>) -> Result<(), CacheError> {
        let holder = PostsHolder {
            posts: posts.to_vec(),
        };
        let encoded = serde_json::to_vec(&holder)?;

        let db = Database::create(&self.path).map_err(unavailable)?;
        let txn = db.begin_write().map_err(unavailable)?;
        {
            let mut posts_table = txn.open_table(POSTS_TABLE).map_err(unavailable)?;
            posts_table
                .insert(STORE_KEY, encoded.as_slice())
                .map_err(unavailable)?;

            if let Some(marker) = last_modified {
                let mut stats_table = txn.open_table(STATS_TABLE).map_err(unavailable)?;
                stats_table.insert(STORE_KEY, marker).map_err(unavailable)?;
            }
        }
        txn.commit().map_err(unavailable)?;

        Ok(())
    }
}
