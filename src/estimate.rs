//! Effort estimation.
//!
//! Two collaborating pieces: the authoritative effort table
//! ([`metrics::EffortTable`]) pricing a component by type and complexity,
//! and the heuristic source scan ([`complexity`]) that derives a complexity
//! label from the code behind a component when source is available.

/// Heuristic source-code complexity scanning.
pub mod complexity;
/// The per-type, per-complexity effort table.
pub mod metrics;

pub use complexity::{analyze_dir, analyze_files, ComplexityRules, ScanConfig};
pub use metrics::{EffortModel, EffortTable, TimeBreakdown};
