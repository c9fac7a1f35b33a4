//! Subject identifier normalization.
//!
//! [`UpnNormalizer`] turns `user@domain` into `DOMAIN\user` and reports each
//! decision through a [`DiagnosticsSink`].

pub mod diagnostics;
pub mod upn;

pub use diagnostics::{DiagnosticsSink, MemorySink, NormalizeEvent, RecordedEvent, TracingSink};
pub use upn::{NormalizeOutcome, Normalized, NormalizerConfig, UpnNormalizer};
