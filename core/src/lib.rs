pub mod aggregate;
pub mod config;
pub mod index;
pub mod mapper;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod rank;
pub mod shuffle;
pub mod store;
pub mod tokenizer;

pub use index::*;
