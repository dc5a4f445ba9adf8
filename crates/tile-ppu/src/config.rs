//! Renderer configuration.

use std::num::NonZeroUsize;
use std::thread;

use crate::palette::ResolverStrategy;

/// Worker count when the host can't report its parallelism.
const FALLBACK_WORKERS: usize = 4;

/// Which palette resolver path to allow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyPreference {
    /// AVX2 when the CPU has it, scalar otherwise.
    #[default]
    Auto,
    /// Always scalar.
    Scalar,
}

impl StrategyPreference {
    /// Resolve against the running CPU.
    #[must_use]
    pub fn resolve(self) -> ResolverStrategy {
        match self {
            Self::Auto => ResolverStrategy::detect(),
            Self::Scalar => ResolverStrategy::Scalar,
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Worker threads. Zero is treated as one. Defaults to the host's
    /// available parallelism.
    pub workers: usize,
    /// Resolver path. Defaults to `Auto`.
    pub strategy: StrategyPreference,
}

impl RenderConfig {
    /// Default configuration with an explicit worker count.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Worker count after clamping.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(FALLBACK_WORKERS, NonZeroUsize::get),
            strategy: StrategyPreference::Auto,
        }
    }
}
