//! Generation provider adapters.

pub mod openai;

pub use openai::{parse_reply, OpenAiGenerator};
