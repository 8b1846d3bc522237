pub mod cleaner;
pub mod downloader;
pub mod error;
pub mod fetch_cache;
pub mod point_fetcher;
pub mod reconcile;
pub mod store;
