//! Data-quality engine for course catalogs and their prerequisite graphs.
//!
//! Raw course and prerequisite records are normalized into a canonical
//! snapshot, validated, and then analyzed for circular prerequisites,
//! completions that skipped a prerequisite, and program-level bias.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod fairness;
pub mod graph;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod report;
pub mod source;
pub mod statistics;
pub mod validate;
