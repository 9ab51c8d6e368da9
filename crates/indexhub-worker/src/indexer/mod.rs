//! Indexing service collaborators.

pub mod http;

pub use http::HttpContentIndexer;
