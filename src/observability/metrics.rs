//! Engine counters
//!
//! - Counters only
//! - Monotonic increase
//! - Relaxed atomics; exact totals, no cross-counter ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters kept by a `FieldResolutionEngine`
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Instances successfully created
    instances_created: AtomicU64,
    /// Inputs rejected by validation
    validations_rejected: AtomicU64,
    /// Default factory invocations
    factory_invocations: AtomicU64,
    /// Omitted fields bound to a shared explicit default
    shared_defaults_bound: AtomicU64,
    /// Supplied values that needed a coercion
    coercions_applied: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_instances_created(&self) {
        self.instances_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validations_rejected(&self) {
        self.validations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_factory_invocations(&self) {
        self.factory_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shared_defaults_bound(&self) {
        self.shared_defaults_bound.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_coercions_applied(&self) {
        self.coercions_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            instances_created: self.instances_created.load(Ordering::Relaxed),
            validations_rejected: self.validations_rejected.load(Ordering::Relaxed),
            factory_invocations: self.factory_invocations.load(Ordering::Relaxed),
            shared_defaults_bound: self.shared_defaults_bound.load(Ordering::Relaxed),
            coercions_applied: self.coercions_applied.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub instances_created: u64,
    pub validations_rejected: u64,
    pub factory_invocations: u64,
    pub shared_defaults_bound: u64,
    pub coercions_applied: u64,
}
