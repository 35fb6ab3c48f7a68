//! Delivery confirmation hooks.
//!
//! Accounting integrations register a [`DeliveryHook`] at start-up. Hooks run
//! in registration order. Only `pre_confirm` can stop a confirmation;
//! `confirmed` is a notification and its failures are contained.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tillstock_core::DeliveryId;

/// Listener for delivery confirmation.
pub trait DeliveryHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called before a delivery is confirmed. Return `true` to veto; the hook
    /// is expected to have told the operator why.
    fn pre_confirm(&self, _delivery: DeliveryId) -> bool {
        false
    }

    /// Called once the delivery is confirmed.
    fn confirmed(&self, _delivery: DeliveryId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fixed, ordered set of hooks. There is no removal.
#[derive(Default)]
pub struct DeliveryHooks {
    hooks: Vec<Box<dyn DeliveryHook>>,
}

impl core::fmt::Debug for DeliveryHooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl DeliveryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, hook: impl DeliveryHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Ask each hook in turn; stops at the first veto and returns its name.
    pub fn vetoed_by(&self, delivery: DeliveryId) -> Option<&str> {
        self.hooks
            .iter()
            .find(|h| h.pre_confirm(delivery))
            .map(|h| h.name())
    }

    /// Notify every hook. A hook that errors or panics is logged and skipped;
    /// the rest still run. Returns the number of hooks that failed.
    pub fn notify_confirmed(&self, delivery: DeliveryId) -> usize {
        let mut failures = 0;
        for hook in &self.hooks {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook.confirmed(delivery)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::warn!(
                        hook = hook.name(),
                        delivery = %delivery,
                        error = %err,
                        "delivery hook failed after confirmation"
                    );
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(
                        hook = hook.name(),
                        delivery = %delivery,
                        "delivery hook panicked after confirmation"
                    );
                }
            }
        }
        failures
    }
}
