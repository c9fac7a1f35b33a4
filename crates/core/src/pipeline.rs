//! Response pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`ResponseStage`]s run once per
//! authentication response. Each stage may rewrite the [`ResponseContext`]
//! and then tells the driver whether to continue with the next stage. Stages
//! never call each other.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attribute_map::{AttributeMap, Attributes};
use crate::config::{ProxyConfig, StageModule};
use crate::errors::{ConfigError, PipelineError};
use crate::identity::{NormalizerConfig, UpnNormalizer};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Per-response state handed from stage to stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseContext {
    /// Subject identifier asserted by the upstream identity provider.
    #[serde(default)]
    pub subject_id: Option<String>,

    /// NameID format URI that came with the subject, if any.
    #[serde(default)]
    pub subject_id_format: Option<String>,

    /// Entity ID of the service provider the response is for.
    #[serde(default)]
    pub requester: Option<String>,

    /// Attributes keyed by local attribute name.
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResponseContext {
    pub fn new(subject_id: Option<String>) -> Self {
        Self {
            subject_id,
            ..Default::default()
        }
    }

    /// Replace externally named attributes with their local names.
    pub fn map_attributes_to_internal(&mut self, map: &AttributeMap) {
        self.attributes = map.internal_attributes(&self.attributes);
    }

    /// Replace locally named attributes with their external names.
    pub fn map_attributes_to_external(&mut self, map: &AttributeMap) {
        self.attributes = map.external_attributes(&self.attributes);
    }
}

// ---------------------------------------------------------------------------
// Stage contract
// ---------------------------------------------------------------------------

/// What the driver should do after a stage returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFlow {
    /// Hand the context to the next stage.
    Continue,
    /// Skip all remaining stages.
    Stop,
}

/// A single transformation step applied to every response.
pub trait ResponseStage: Send + Sync {
    /// Stage name for logs and errors.
    fn name(&self) -> &str;

    /// Apply the stage to `ctx`.
    fn process(&self, ctx: &mut ResponseContext) -> Result<StageFlow, PipelineError>;
}

// ---------------------------------------------------------------------------
// ConvertUpnToSam
// ---------------------------------------------------------------------------

/// Rewrites `subject_id` from `user@domain` to `DOMAIN\user`.
///
/// Never fails and always continues.
#[derive(Debug, Clone)]
pub struct ConvertUpnToSam {
    name: String,
    normalizer: UpnNormalizer,
}

impl ConvertUpnToSam {
    pub fn new(name: impl Into<String>, normalizer: UpnNormalizer) -> Self {
        Self {
            name: name.into(),
            normalizer,
        }
    }

    /// Build the stage with the default tracing diagnostics.
    pub fn from_config(name: impl Into<String>, config: NormalizerConfig) -> Self {
        Self::new(name, UpnNormalizer::new(config))
    }
}

impl ResponseStage for ConvertUpnToSam {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ResponseContext) -> Result<StageFlow, PipelineError> {
        let normalized = self.normalizer.normalize(ctx.subject_id.as_deref());
        if normalized.outcome.is_converted() {
            ctx.subject_id = normalized.value;
        }
        Ok(StageFlow::Continue)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Summary of one [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    /// Number of stages that ran.
    pub executed: usize,
    /// Name of the stage that returned [`StageFlow::Stop`], if any.
    pub stopped_by: Option<String>,
}

/// Ordered response stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn ResponseStage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the stages declared in `config`, in order.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let mut pipeline = Self::new();
        for stage in &config.response_stages {
            match stage.module {
                StageModule::ConvertUpnToSam => {
                    let normalizer_config = stage.normalizer_config()?;
                    debug!(
                        stage = %stage.name,
                        module = stage.module.as_str(),
                        domain_to_upper = normalizer_config.domain_to_upper,
                        "building response stage"
                    );
                    pipeline.push(Arc::new(ConvertUpnToSam::from_config(
                        stage.name.clone(),
                        normalizer_config,
                    )));
                }
            }
        }
        info!(stages = pipeline.len(), "response pipeline built");
        Ok(pipeline)
    }

    /// Append a stage.
    pub fn push(&mut self, stage: Arc<dyn ResponseStage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order against `ctx`.
    ///
    /// Stops early when a stage returns [`StageFlow::Stop`]. The first stage
    /// error aborts the run; changes made by earlier stages stay in `ctx`.
    pub fn run(&self, ctx: &mut ResponseContext) -> Result<PipelineRun, PipelineError> {
        let mut executed = 0;
        for stage in &self.stages {
            debug!(stage = stage.name(), "running response stage");
            let flow = stage.process(ctx).map_err(|e| {
                warn!(stage = stage.name(), error = %e, "response stage failed");
                // The driver's stage name wins over whatever the stage reported.
                match e {
                    PipelineError::StageFailed { detail, .. } => PipelineError::StageFailed {
                        stage: stage.name().to_string(),
                        detail,
                    },
                }
            })?;
            executed += 1;

            if flow == StageFlow::Stop {
                debug!(stage = stage.name(), "response stage stopped the pipeline");
                return Ok(PipelineRun {
                    executed,
                    stopped_by: Some(stage.name().to_string()),
                });
            }
        }

        Ok(PipelineRun {
            executed,
            stopped_by: None,
        })
    }
}
