//! Periodic checkpoints inside the heavy loops
//!
//! Every long loop (indexing, assembly, each encoder, the three MPR passes)
//! calls [`Checkpoint::tick`] once per iteration. Every `interval` iterations
//! the thread yields and the caller's hook runs, so memory-pressure monitoring
//! can be wired in from outside.

use log::debug;
use std::fmt;
use std::sync::Arc;

/// Loop a checkpoint fired from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Indexing,
    Assembly,
    Encoding(&'static str),
    MprAxial,
    MprSagittal,
    MprCoronal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexing => write!(f, "indexing"),
            Self::Assembly => write!(f, "assembly"),
            Self::Encoding(format) => write!(f, "encoding-{format}"),
            Self::MprAxial => write!(f, "mpr-axial"),
            Self::MprSagittal => write!(f, "mpr-sagittal"),
            Self::MprCoronal => write!(f, "mpr-coronal"),
        }
    }
}

/// Caller-supplied hook, e.g. to sample RSS or trim an allocator
pub type CheckpointHook = Arc<dyn Fn(Stage, usize) + Send + Sync>;

#[derive(Clone)]
pub struct Checkpoint {
    stage: Stage,
    interval: usize,
    enabled: bool,
    hook: Option<CheckpointHook>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(stage: Stage, interval: usize, enabled: bool, hook: Option<CheckpointHook>) -> Self {
        Self {
            stage,
            interval: interval.max(1),
            enabled,
            hook,
        }
    }

    /// A checkpoint that never fires
    #[must_use]
    pub fn disabled(stage: Stage) -> Self {
        Self::new(stage, 1, false, None)
    }

    /// Same hook and switch, different loop
    #[must_use]
    pub fn for_stage(&self, stage: Stage, interval: usize) -> Self {
        Self::new(stage, interval, self.enabled, self.hook.clone())
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Returns true when the checkpoint fired on this iteration
    #[inline]
    pub fn tick(&self, iteration: usize) -> bool {
        if !self.enabled || iteration % self.interval != 0 {
            return false;
        }
        std::thread::yield_now();
        debug!("checkpoint {} at iteration {iteration}", self.stage);
        if let Some(hook) = &self.hook {
            hook(self.stage, iteration);
        }
        true
    }

    /// Unconditional stage marker, fired between phases
    pub fn mark(&self, label: &str) {
        if !self.enabled {
            return;
        }
        debug!("stage {label}");
        if let Some(hook) = &self.hook {
            hook(self.stage, usize::MAX);
        }
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkpoint")
            .field("stage", &self.stage)
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
