use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use hubnet_core::error::Result;

use super::types::ChatEvent;
use crate::obs::NodeMetrics;

/// One transformation step, scoped to a single event kind.
pub trait ChatModule<E: ChatEvent>: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> E::Kind;
    fn process(&self, event: &mut E) -> Result<()>;
}

/// Ordered module chains, one per event kind.
///
/// Chains run in registration order. A module that errors or panics is
/// logged and rolled back: the event continues as if it never ran.
pub struct ModuleManager<E: ChatEvent> {
    stage: &'static str,
    chains: RwLock<HashMap<E::Kind, Vec<Arc<dyn ChatModule<E>>>>>,
    metrics: Arc<NodeMetrics>,
}

impl<E: ChatEvent> ModuleManager<E> {
    pub fn new(stage: &'static str, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            stage,
            chains: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Append `module` to the chain for its kind.
    pub fn register(&self, module: Arc<dyn ChatModule<E>>) {
        self.chains
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(module.kind())
            .or_default()
            .push(module);
    }

    /// Module names for `kind`, in run order.
    pub fn modules_for(&self, kind: E::Kind) -> Vec<&'static str> {
        self.chains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map(|chain| chain.iter().map(|m| m.name()).collect())
            .unwrap_or_default()
    }

    /// Run the chain for `event.kind()` over `event`.
    /// Returns how many modules completed; stops early once cancelled.
    pub fn intake(&self, event: &mut E) -> usize {
        let kind = event.kind();
        let chain = self
            .chains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut completed = 0;
        for module in chain {
            if event.body().is_cancelled() {
                break;
            }

            let before = event.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| module.process(event)));
            let reason = match outcome {
                Ok(Ok(())) => {
                    completed += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "panicked".to_string(),
            };

            tracing::warn!(stage = self.stage, module = module.name(), ?kind, %reason, "chat module failed");
            self.metrics
                .module_failures
                .inc(&[("stage", self.stage), ("module", module.name())]);
            *event = before;
        }
        completed
    }
}
