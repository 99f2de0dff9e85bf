//! choicebench-report: JSON report generation.
//!
//! Every run produces three families of files, each carrying a
//! `metadata { evaluation_time, evaluator }` header:
//!
//! - `evaluation_results_<ts>.json` with every model summary
//! - `wrong_answers_<ts>/<model>.json` with the questions a model missed
//! - `complete_results_<ts>/<model>.json` plus `evaluation_summary.json`

pub mod json;

pub use json::{
    slug, write_all, write_complete_answers, write_results, write_wrong_answers, ReportMetadata,
    ReportPaths,
};
