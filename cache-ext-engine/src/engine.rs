//! The engine facade: wires the metadata store, policy lists, metric
//! accumulator, policy kernels, and adaptive controller together behind the
//! five hooks a host cgroup attachment drives (component F, in
//! `dispatcher.rs`).

use std::collections::HashMap;

use cache_ext_core::{CompatibilityMode, EventSink, InodeWatchlist, LogicalClock, NullSink, Policy, WorkingSet};

use crate::config::EngineConfig;
use crate::kernels::{FifoKernel, LhdKernel, ListSet, LruKernel, MruKernel, PolicyKernel, S3FifoKernel};
use crate::metadata::MetadataStore;
use crate::metrics::MetricAccumulator;
use crate::controller::AdaptiveController;

/// Everything one cgroup attachment needs: state plus the policy kernel
/// registry. `init` is the only operation permitted to allocate.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) watchlist: InodeWatchlist,
    pub(crate) clock: LogicalClock,
    pub(crate) metadata: MetadataStore,
    pub(crate) lists: ListSet,
    pub(crate) metrics: MetricAccumulator,
    pub(crate) working_set: WorkingSet,
    pub(crate) controller: AdaptiveController,
    pub(crate) kernels: HashMap<u32, Box<dyn PolicyKernel>>,
    pub(crate) sink: Box<dyn EventSink>,
    pub(crate) compat: CompatibilityMode,
}

impl Engine {
    /// `init(cgroup)`: create lists, set `current_policy = MRU`, zero all
    /// counters. This is the only hook permitted to allocate.
    pub fn init(config: EngineConfig, watchlist: InodeWatchlist) -> Self {
        Self::with_sink(config, watchlist, Box::new(NullSink), CompatibilityMode::Full)
    }

    pub fn with_sink(
        config: EngineConfig,
        watchlist: InodeWatchlist,
        sink: Box<dyn EventSink>,
        compat: CompatibilityMode,
    ) -> Self {
        let mut kernels: HashMap<u32, Box<dyn PolicyKernel>> = HashMap::new();
        kernels.insert(Policy::Mru.as_u32(), Box::new(MruKernel));
        kernels.insert(Policy::Fifo.as_u32(), Box::new(FifoKernel));
        kernels.insert(Policy::Lru.as_u32(), Box::new(LruKernel));
        if config.enable_s3fifo {
            kernels.insert(Policy::S3Fifo.as_u32(), Box::new(S3FifoKernel));
        }
        if config.enable_lhd {
            kernels.insert(Policy::Lhd.as_u32(), Box::new(LhdKernel));
        }

        let working_set = WorkingSet::new(config.working_set_capacity);

        Self {
            metadata: MetadataStore::new(),
            lists: ListSet::new(),
            metrics: MetricAccumulator::new(),
            clock: LogicalClock::new(),
            controller: AdaptiveController::new(),
            working_set,
            kernels,
            watchlist,
            sink,
            compat,
            config,
        }
    }

    pub fn current_policy(&self) -> Policy {
        self.controller.current_policy()
    }

    pub fn switch_count(&self) -> u64 {
        self.controller.switch_count()
    }

    pub fn tracked_pages(&self) -> usize {
        self.metadata.len()
    }

    /// Sum of all policy list sizes. Invariant 1/5 requires this to equal
    /// `tracked_pages()` at every observation point.
    pub fn list_entries(&self) -> usize {
        self.lists.total_len()
    }

    pub fn last_switch_ts(&self) -> u64 {
        self.controller.last_switch_ts()
    }

    pub fn clock_now(&self) -> u64 {
        self.clock.now()
    }

    pub fn metrics(&self) -> &MetricAccumulator {
        &self.metrics
    }

    /// The wire compatibility mode this attachment was configured with,
    /// for a caller building its own encoder around `sink`.
    pub fn compat_mode(&self) -> CompatibilityMode {
        self.compat
    }

}

/// Free function rather than a method so callers can borrow `&self.kernels`
/// independently of a simultaneous `&mut self.lists` borrow.
pub(crate) fn kernel_for(
    kernels: &HashMap<u32, Box<dyn PolicyKernel>>,
    policy: Policy,
) -> &dyn PolicyKernel {
    kernels
        .get(&policy.as_u32())
        .map(|k| k.as_ref())
        .unwrap_or_else(|| {
            // A policy the engine was configured to exclude was somehow
            // selected (unreachable given the cascade's own fallbacks);
            // MRU is always present.
            kernels.get(&Policy::Mru.as_u32()).unwrap().as_ref()
        })
}
