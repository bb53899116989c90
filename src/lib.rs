// Client-side search engine for a bilingual (English/Spanish) help desk knowledge base

// Include the error module
mod error;
pub use error::*;

// Include the configuration module
mod config;
pub use config::*;

// Include the key-value store module
mod store;
pub use store::*;

// Include the search module
mod search;
pub use search::*;
