use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        postsdb_url: get_env_or_default("POSTSDB_URL", "http://localhost:3000/postsdb"),
        cache_dir: get_env_or_default("CACHE_DIR", ".quill-cache"),
    }
});

pub struct Config {
    pub postsdb_url: String,
    pub cache_dir: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
