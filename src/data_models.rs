use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A display label carried together with its precomputed link path.
/// Serialized as the two-element array `[href, label]` the posts
/// endpoint emits; the pair is denormalized at publish time and never
/// re-derived at query time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Linked(pub String, pub String);

impl Linked {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Linked {
        Linked(href.into(), label.into())
    }

    pub fn href(&self) -> &str {
        &self.0
    }

    pub fn label(&self) -> &str {
        &self.1
    }
}

/// A blog post as persisted in the cache and served by the posts
/// endpoint. `slug` is the stable unique identifier within a corpus
/// snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub category: Linked,
    pub description: String,
    pub author: Linked,
    pub date: DateTime<Utc>,
    pub draft: bool,
    pub content: String,
}

impl Post {
    /// A post is publishable once its draft flag is cleared and its
    /// publication date is at or before the given clock reading.
    pub fn is_publishable(&self, before: DateTime<Utc>) -> bool {
        !self.draft && self.date <= before
    }
}

/// Display projection of a [`Post`], with the full text content
/// dropped. Never persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub slug: String,
    pub title: String,
    pub category: Linked,
    pub description: String,
    pub author: Linked,
    pub date: DateTime<Utc>,
}

impl From<&Post> for SearchResult {
    fn from(post: &Post) -> SearchResult {
        SearchResult {
            slug: post.slug.clone(),
            title: post.title.clone(),
            category: post.category.clone(),
            description: post.description.clone(),
            author: post.author.clone(),
            date: post.date,
        }
    }
}

/// JSON envelope of the posts endpoint body and of the cached posts
/// record: `{"posts": [...]}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostsHolder {
    pub posts: Vec<Post>,
}
