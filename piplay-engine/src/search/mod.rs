//! Search resolution and per-requester result caching

pub mod cache;
pub mod resolver;

pub use cache::{RequesterId, SearchResultCache, SearchResultSet};
pub use resolver::SearchResolver;
