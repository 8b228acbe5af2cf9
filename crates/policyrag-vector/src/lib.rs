//! Semantic stores for chunk embeddings.
//!
//! [`LanceVectorStore`] persists to a LanceDB directory and is what the CLI
//! uses; [`InMemoryVectorStore`] serves tests and small corpora.

pub mod filter;
pub mod lance;
pub mod memory;
pub mod schema;

pub use filter::filter_to_sql;
pub use lance::LanceVectorStore;
pub use memory::{cosine, InMemoryVectorStore};
