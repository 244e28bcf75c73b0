pub mod config;
pub mod error;
pub mod extractor;
pub mod index;
pub mod metadata;
pub mod search;
pub mod search_clients;
pub mod walker;

pub use error::AppError;
