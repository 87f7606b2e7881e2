pub mod candidate_generation;
pub mod clustering;
pub mod error;
pub mod evaluation;
pub mod loading;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use error::{DedupeError, DedupeResult};
