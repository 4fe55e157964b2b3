//! Loading and integrity-checking of extraction output.

/// Extraction output loading.
pub mod extraction;
/// Pool fingerprinting for map-staleness detection.
pub mod snapshot;

pub use extraction::{load_pool, ExtractionFilters, LoadError};
pub use snapshot::fingerprint;
