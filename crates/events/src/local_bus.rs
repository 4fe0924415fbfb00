//! The bus used inside one client process.

use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("signal bus lock poisoned")]
    Poisoned,
}

/// Synchronous fan-out over std channels.
///
/// Publishing never blocks on a slow subscriber; a subscription that has been
/// dropped is forgotten at the next publish.
#[derive(Debug)]
pub struct LocalBus<M> {
    subscribers: Mutex<Vec<Sender<M>>>,
}

impl<M> LocalBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions still registered. Dropped ones count until the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<M> Default for LocalBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for LocalBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = BusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subscribers = self.subscribers.lock().map_err(|_| BusError::Poisoned)?;
        subscribers.retain(|subscriber| subscriber.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (sender, receiver) = mpsc::channel();
        // The list holds only senders, so a poisoned lock leaves it usable.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
        Subscription::new(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscription_sees_each_signal() {
        let bus = LocalBus::<&str>::new();
        let toasts = bus.subscribe();
        let audit = bus.subscribe();

        bus.publish("revoked").unwrap();

        assert_eq!(toasts.drain(), vec!["revoked"]);
        assert_eq!(audit.drain(), vec!["revoked"]);
    }

    #[test]
    fn late_subscriptions_miss_earlier_signals() {
        let bus = LocalBus::<u8>::new();
        bus.publish(1).unwrap();
        let late = bus.subscribe();
        bus.publish(2).unwrap();

        assert_eq!(late.drain(), vec![2]);
    }

    #[test]
    fn dropped_subscriptions_are_forgotten() {
        let bus = LocalBus::<u8>::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(1).unwrap();

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain(), vec![1]);
    }
}
