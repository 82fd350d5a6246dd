//! Adaptive page-cache eviction engine.
//!
//! Components, leaves first: the metadata store (`metadata`), the policy
//! lists (`list`), the metric accumulator (`metrics`), the policy kernels
//! (`kernels`), the adaptive controller (`controller`), and the hook
//! dispatcher (`dispatcher`) that fans the five lifecycle hooks in from
//! `engine::Engine`.

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod engine;
pub mod kernels;
pub mod list;
pub mod metadata;
pub mod metrics;

pub use config::{EngineConfig, ListArrangement};
pub use dispatcher::EvictionContext;
pub use engine::Engine;
pub use kernels::{IterateContext, ListSet, PolicyKernel};
pub use list::{FromEnd, PolicyList, PolicyTag, Verdict};
pub use metadata::{DebugCounters, MetadataStore, PageMetadata};
pub use metrics::MetricAccumulator;
