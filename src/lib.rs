pub mod cache;
pub mod client;
pub mod config;
pub mod data_models;
pub mod fetcher;
pub mod loader;
pub mod messages;
pub mod search;
pub mod worker;
