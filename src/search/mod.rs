// Search module for the help desk knowledge base
// Fuzzy scoring, ranked search, snippets, suggestions, history and the host bridge

mod fuzzy;
mod index;
mod corpus;
mod snippet;
mod suggestions;
mod history;
mod debounce;
mod engine;
mod bridge;

pub use fuzzy::*;
pub use index::*;
pub use corpus::*;
pub use snippet::*;
pub use suggestions::*;
pub use history::*;
pub use debounce::*;
pub use engine::*;
pub use bridge::*;
