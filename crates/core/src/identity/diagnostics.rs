//! Diagnostics sinks for subject normalization.
//!
//! [`UpnNormalizer`](super::UpnNormalizer) reports exactly one
//! [`NormalizeEvent`] per call to the sink it was constructed with. The
//! default [`TracingSink`] forwards events to `tracing`; [`MemorySink`] keeps
//! them in memory so callers can inspect what happened.

use std::sync::Mutex;

use tracing::{info, warn, Level};

use super::upn::NormalizeOutcome;

/// A single diagnostic record emitted by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeEvent<'a> {
    /// Severity: `WARN` for an empty identifier, `INFO` otherwise.
    pub level: Level,
    pub outcome: NormalizeOutcome,
    /// The identifier as received (absent for `SkippedEmpty` on `None`).
    pub original: Option<&'a str>,
    /// The rewritten identifier (only for `Converted`).
    pub converted: Option<&'a str>,
}

impl NormalizeEvent<'_> {
    /// Human-readable message for logs.
    pub fn message(&self) -> String {
        match (self.outcome, self.original, self.converted) {
            (NormalizeOutcome::Converted, Some(original), Some(converted)) => {
                format!("Converted {} to {}", original, converted)
            }
            (NormalizeOutcome::SkippedNoMatch, Some(original), _) => format!(
                "{} did not match userPrincipalName format and was skipped",
                original
            ),
            _ => "NameID is empty and will be skipped".to_string(),
        }
    }

    /// Copy the event into an owned [`RecordedEvent`].
    pub fn to_recorded(&self) -> RecordedEvent {
        RecordedEvent {
            level: self.level,
            outcome: self.outcome,
            original: self.original.map(str::to_string),
            converted: self.converted.map(str::to_string),
        }
    }
}

/// Receives normalization events.
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, event: &NormalizeEvent<'_>);
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Forwards events to the `tracing` subscriber installed by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, event: &NormalizeEvent<'_>) {
        let outcome = event.outcome.label();
        let original = event.original.unwrap_or_default();
        let converted = event.converted.unwrap_or_default();

        if event.level == Level::WARN {
            warn!(outcome, "{}", event.message());
        } else {
            info!(outcome, original, converted, "{}", event.message());
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Owned copy of a [`NormalizeEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub level: Level,
    pub outcome: NormalizeOutcome,
    pub original: Option<String>,
    pub converted: Option<String>,
}

/// Records every event it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(events) => events.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(&self, event: &NormalizeEvent<'_>) {
        let recorded = event.to_recorded();
        match self.events.lock() {
            Ok(mut events) => events.push(recorded),
            Err(poisoned) => poisoned.into_inner().push(recorded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted_event() -> NormalizeEvent<'static> {
        NormalizeEvent {
            level: Level::INFO,
            outcome: NormalizeOutcome::Converted,
            original: Some("jdoe@example.com"),
            converted: Some("EXAMPLE.COM\\jdoe"),
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            converted_event().message(),
            "Converted jdoe@example.com to EXAMPLE.COM\\jdoe"
        );

        let skipped = NormalizeEvent {
            level: Level::INFO,
            outcome: NormalizeOutcome::SkippedNoMatch,
            original: Some("jdoe"),
            converted: None,
        };
        assert_eq!(
            skipped.message(),
            "jdoe did not match userPrincipalName format and was skipped"
        );

        let empty = NormalizeEvent {
            level: Level::WARN,
            outcome: NormalizeOutcome::SkippedEmpty,
            original: None,
            converted: None,
        };
        assert_eq!(empty.message(), "NameID is empty and will be skipped");
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(&converted_event());
        sink.emit(&NormalizeEvent {
            level: Level::WARN,
            outcome: NormalizeOutcome::SkippedEmpty,
            original: None,
            converted: None,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, NormalizeOutcome::Converted);
        assert_eq!(events[0].converted.as_deref(), Some("EXAMPLE.COM\\jdoe"));
        assert_eq!(events[1].level, Level::WARN);

        sink.clear();
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.emit(&converted_event());
    }
}
