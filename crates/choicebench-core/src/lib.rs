//! choicebench-core: Core eval engine, answer extraction, and scoring.
//!
//! This crate defines the question/result data model, the backend trait,
//! and the dispatch → extract → retry → aggregate pipeline that the rest of
//! choicebench builds on.

pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod retry;
pub mod statistics;
pub mod traits;

pub use error::EvalError;
