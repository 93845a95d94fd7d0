//! Pipeline states and the stages that move between them.

use serde::{Deserialize, Serialize};

/// Where a publish run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineState {
    /// Nothing has run yet
    Idle,
    /// Manifest read and parsed
    ManifestLoaded,
    /// Transform sequence applied in memory
    Transformed,
    /// Transformed manifest persisted
    Written,
    /// Registry accepted the package
    Published,
    /// A stage failed; the run halted
    Failed,
}

/// Unit of work that advances the pipeline by one state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Release tag and configuration checks
    Trigger,
    /// Idle -> ManifestLoaded
    Load,
    /// ManifestLoaded -> Transformed
    Transform,
    /// Transformed -> Written
    Write,
    /// Written -> Published
    Publish,
}

impl Stage {
    /// State the pipeline must be in before this stage runs
    pub fn requires(self) -> PipelineState {
        match self {
            Stage::Trigger | Stage::Load => PipelineState::Idle,
            Stage::Transform => PipelineState::ManifestLoaded,
            Stage::Write => PipelineState::Transformed,
            Stage::Publish => PipelineState::Written,
        }
    }

    /// State reached when this stage succeeds
    pub fn produces(self) -> PipelineState {
        match self {
            Stage::Trigger => PipelineState::Idle,
            Stage::Load => PipelineState::ManifestLoaded,
            Stage::Transform => PipelineState::Transformed,
            Stage::Write => PipelineState::Written,
            Stage::Publish => PipelineState::Published,
        }
    }
}

impl PipelineState {
    /// Whether no further stage can run
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Published | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Idle"),
            PipelineState::ManifestLoaded => write!(f, "ManifestLoaded"),
            PipelineState::Transformed => write!(f, "Transformed"),
            PipelineState::Written => write!(f, "Written"),
            PipelineState::Published => write!(f, "Published"),
            PipelineState::Failed => write!(f, "Failed"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Trigger => write!(f, "trigger"),
            Stage::Load => write!(f, "load"),
            Stage::Transform => write!(f, "transform"),
            Stage::Write => write!(f, "write"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}
