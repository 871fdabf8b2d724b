//! DSC engine command line support.
//!
//! Scenario files drive the engine against in-memory collaborators; the
//! output module renders the results.

pub mod output;
pub mod scenario;

pub use output::*;
pub use scenario::*;
