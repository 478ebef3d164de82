pub mod cache;
pub mod loader;
pub mod provider;
pub mod types;
