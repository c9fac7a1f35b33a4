//! userPrincipalName to SamAccountName conversion.
//!
//! [`UpnNormalizer`] rewrites a subject identifier of the form `user@domain`
//! into `DOMAIN\user`. The identifier is split on the first `@`; the domain
//! part keeps everything after it, further `@` characters included. Anything
//! without an `@` is passed through untouched.
//!
//! | Input | Outcome | Event level |
//! |-------|---------|-------------|
//! | absent or `""` | `SkippedEmpty` | warn |
//! | no `@` | `SkippedNoMatch` | info |
//! | `local@domain` | `Converted` | info |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Level;

use super::diagnostics::{DiagnosticsSink, NormalizeEvent, TracingSink};

/// Separator between domain and user in a SamAccountName-style identifier.
pub const SAM_SEPARATOR: char = '\\';

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Normalizer configuration.
///
/// `domain_to_upper` has no default: a stage declared without it fails to
/// build instead of silently picking a case policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizerConfig {
    /// Upper-case the domain part before reassembly.
    pub domain_to_upper: bool,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What happened to an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeOutcome {
    /// No identifier was supplied.
    SkippedEmpty,
    /// The identifier was rewritten into `DOMAIN\user` form.
    Converted,
    /// The identifier has no `@` and was left as is.
    SkippedNoMatch,
}

impl NormalizeOutcome {
    /// Short label for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkippedEmpty => "skipped_empty",
            Self::Converted => "converted",
            Self::SkippedNoMatch => "skipped_no_match",
        }
    }

    /// `true` if the identifier was rewritten.
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted)
    }

    /// Severity of the diagnostic event for this outcome.
    pub fn level(&self) -> Level {
        match self {
            Self::SkippedEmpty => Level::WARN,
            Self::Converted | Self::SkippedNoMatch => Level::INFO,
        }
    }
}

impl fmt::Display for NormalizeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a single [`UpnNormalizer::normalize`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalized {
    /// The identifier to carry forward (rewritten or unchanged).
    pub value: Option<String>,
    pub outcome: NormalizeOutcome,
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

/// Split an identifier in UPN shape into `(local, domain)`.
///
/// Returns `None` when there is no `@`. The local part is everything before
/// the first `@`; the domain part is the whole remainder.
pub fn split_upn(identifier: &str) -> Option<(&str, &str)> {
    identifier.split_once('@')
}

/// Build `domain\local`, upper-casing only the domain when asked.
pub fn to_sam_account_name(local: &str, domain: &str, domain_to_upper: bool) -> String {
    let domain = if domain_to_upper {
        domain.to_uppercase()
    } else {
        domain.to_string()
    };
    format!("{}{}{}", domain, SAM_SEPARATOR, local)
}

// ---------------------------------------------------------------------------
// UpnNormalizer
// ---------------------------------------------------------------------------

/// Rewrites UPN-shaped subject identifiers into SamAccountName shape.
///
/// Holds no mutable state; safe to share across request handlers.
#[derive(Clone)]
pub struct UpnNormalizer {
    config: NormalizerConfig,
    sink: Arc<dyn DiagnosticsSink>,
}

impl fmt::Debug for UpnNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpnNormalizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UpnNormalizer {
    /// Create a normalizer that reports through [`TracingSink`].
    pub fn new(config: NormalizerConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a normalizer that reports through the given sink.
    pub fn with_sink(config: NormalizerConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> NormalizerConfig {
        self.config
    }

    /// Normalize one identifier, emitting exactly one diagnostic event.
    pub fn normalize(&self, identifier: Option<&str>) -> Normalized {
        let original = match identifier {
            Some(id) if !id.is_empty() => id,
            _ => {
                self.report(NormalizeOutcome::SkippedEmpty, None, None);
                return Normalized {
                    value: identifier.map(str::to_string),
                    outcome: NormalizeOutcome::SkippedEmpty,
                };
            }
        };

        match split_upn(original) {
            Some((local, domain)) => {
                let converted = to_sam_account_name(local, domain, self.config.domain_to_upper);
                self.report(
                    NormalizeOutcome::Converted,
                    Some(original),
                    Some(converted.as_str()),
                );
                Normalized {
                    value: Some(converted),
                    outcome: NormalizeOutcome::Converted,
                }
            }
            None => {
                self.report(NormalizeOutcome::SkippedNoMatch, Some(original), None);
                Normalized {
                    value: Some(original.to_string()),
                    outcome: NormalizeOutcome::SkippedNoMatch,
                }
            }
        }
    }

    fn report(
        &self,
        outcome: NormalizeOutcome,
        original: Option<&str>,
        converted: Option<&str>,
    ) {
        self.sink.emit(&NormalizeEvent {
            level: outcome.level(),
            outcome,
            original,
            converted,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::diagnostics::MemorySink;

    fn normalizer(domain_to_upper: bool) -> (UpnNormalizer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let normalizer =
            UpnNormalizer::with_sink(NormalizerConfig { domain_to_upper }, sink.clone());
        (normalizer, sink)
    }

    #[test]
    fn test_converts_upn() {
        let (n, _) = normalizer(false);
        let result = n.normalize(Some("jdoe@example.com"));
        assert_eq!(result.value.as_deref(), Some("example.com\\jdoe"));
        assert_eq!(result.outcome, NormalizeOutcome::Converted);
    }

    #[test]
    fn test_domain_to_upper_only_touches_domain() {
        let (n, _) = normalizer(true);
        let result = n.normalize(Some("jdoe@example.com"));
        assert_eq!(result.value.as_deref(), Some("EXAMPLE.COM\\jdoe"));

        let result = n.normalize(Some("JDoe@corp.local"));
        assert_eq!(result.value.as_deref(), Some("CORP.LOCAL\\JDoe"));
    }

    #[test]
    fn test_preserves_domain_case_when_not_upper() {
        let (n, _) = normalizer(false);
        let result = n.normalize(Some("jdoe@Example.com"));
        assert_eq!(result.value.as_deref(), Some("Example.com\\jdoe"));
        assert_eq!(result.outcome, NormalizeOutcome::Converted);
    }

    #[test]
    fn test_multiple_at_signs_fold_into_domain() {
        let (n, _) = normalizer(false);
        let result = n.normalize(Some("a@b@c"));
        assert_eq!(result.value.as_deref(), Some("b@c\\a"));
        assert_eq!(result.outcome, NormalizeOutcome::Converted);
    }

    #[test]
    fn test_no_at_passes_through() {
        let (n, sink) = normalizer(true);
        for input in ["jdoe", "CORP\\jdoe", " ", "a.b.c"] {
            let result = n.normalize(Some(input));
            assert_eq!(result.value.as_deref(), Some(input));
            assert_eq!(result.outcome, NormalizeOutcome::SkippedNoMatch);
        }

        let events = sink.events();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.level == Level::INFO));
        assert_eq!(events[0].original.as_deref(), Some("jdoe"));
        assert_eq!(events[0].converted, None);
    }

    #[test]
    fn test_absent_identifier_is_skipped_with_warning() {
        let (n, sink) = normalizer(true);
        let result = n.normalize(None);
        assert_eq!(result.value, None);
        assert_eq!(result.outcome, NormalizeOutcome::SkippedEmpty);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].outcome, NormalizeOutcome::SkippedEmpty);
        assert_eq!(events[0].original, None);
    }

    #[test]
    fn test_empty_string_is_skipped_with_warning() {
        let (n, sink) = normalizer(false);
        let result = n.normalize(Some(""));
        assert_eq!(result.value.as_deref(), Some(""));
        assert_eq!(result.outcome, NormalizeOutcome::SkippedEmpty);
        assert_eq!(sink.events()[0].level, Level::WARN);
    }

    #[test]
    fn test_degenerate_at_inputs_do_not_panic() {
        let (n, _) = normalizer(true);
        assert_eq!(n.normalize(Some("@")).value.as_deref(), Some("\\"));
        assert_eq!(
            n.normalize(Some("@corp.local")).value.as_deref(),
            Some("CORP.LOCAL\\")
        );
        assert_eq!(n.normalize(Some("jdoe@")).value.as_deref(), Some("\\jdoe"));
        assert_eq!(n.normalize(Some("@@@")).value.as_deref(), Some("@@\\"));
    }

    #[test]
    fn test_converted_value_is_not_converted_again() {
        let (n, _) = normalizer(true);
        let first = n.normalize(Some("jdoe@example.com"));
        let second = n.normalize(first.value.as_deref());
        assert_eq!(second.outcome, NormalizeOutcome::SkippedNoMatch);
        assert_eq!(second.value, first.value);
    }

    #[test]
    fn test_converted_event_carries_both_values() {
        let (n, sink) = normalizer(true);
        n.normalize(Some("jdoe@example.com"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::INFO);
        assert_eq!(events[0].original.as_deref(), Some("jdoe@example.com"));
        assert_eq!(events[0].converted.as_deref(), Some("EXAMPLE.COM\\jdoe"));
    }

    #[test]
    fn test_unicode_domain_upper() {
        let (n, _) = normalizer(true);
        let result = n.normalize(Some("jürgen@straße.de"));
        assert_eq!(result.value.as_deref(), Some("STRASSE.DE\\jürgen"));
    }

    #[test]
    fn test_config_requires_domain_to_upper() {
        let err = toml::from_str::<NormalizerConfig>("").unwrap_err();
        assert!(err.to_string().contains("domain_to_upper"));

        let cfg: NormalizerConfig = toml::from_str("domain_to_upper = true").unwrap();
        assert!(cfg.domain_to_upper);

        assert!(toml::from_str::<NormalizerConfig>(
            "domain_to_upper = true\ndomain_to_lower = false"
        )
        .is_err());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(NormalizeOutcome::SkippedEmpty.to_string(), "skipped_empty");
        assert_eq!(NormalizeOutcome::Converted.label(), "converted");
        assert_eq!(NormalizeOutcome::SkippedNoMatch.label(), "skipped_no_match");
        assert!(NormalizeOutcome::Converted.is_converted());
        assert!(!NormalizeOutcome::SkippedNoMatch.is_converted());
    }
}
