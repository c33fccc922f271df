//! Flowchart graph schema for textflow.
//!
//! Validates candidate graph documents into immutable `Graph` values, reports
//! every failing field path, and offers advisory lint checks plus DOT export.

pub mod diagnostics;
pub mod dot;
pub mod errors;
pub mod graph;
pub mod lint;
pub mod schema;

pub use diagnostics::*;
pub use dot::*;
pub use errors::*;
pub use graph::*;
pub use lint::*;
pub use schema::*;
