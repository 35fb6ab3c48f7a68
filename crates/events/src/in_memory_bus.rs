//! Single-process bus over std channels.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("event bus subscriber list is poisoned")]
    Poisoned,
}

/// Fans each message out to every live subscription. Subscriptions that have
/// been dropped are forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + Send + 'static> EventBus<M> for InMemoryEventBus<M> {
    type Error = BusError;

    fn publish(&self, message: M) -> Result<(), BusError> {
        let mut senders = self.senders.lock().map_err(|_| BusError::Poisoned)?;
        let live = senders.len();
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        if senders.len() != live {
            tracing::debug!(gone = live - senders.len(), "forgot closed subscriptions");
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            Err(_) => tracing::warn!("subscribed to a poisoned bus; nothing will arrive"),
        }
        Subscription::new(rx)
    }
}
