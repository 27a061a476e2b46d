use crate::domain::request::{Outcome, RequestId};
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

enum Slot {
    Waiting(Vec<oneshot::Sender<Outcome>>),
    Delivered(Outcome),
}

/// One-shot completion fan-out, keyed by request id.
///
/// A published outcome is kept until [`CompletionNotifier::acknowledge`] so
/// that a subscriber arriving after `publish` still resolves.
#[derive(Default, Clone)]
pub struct CompletionNotifier {
    slots: Arc<DashMap<RequestId, Slot>>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, id: &RequestId) -> Waiter {
        let mut slot = self
            .slots
            .entry(id.clone())
            .or_insert_with(|| Slot::Waiting(Vec::new()));

        let state = match &mut *slot {
            Slot::Delivered(outcome) => WaiterState::Ready(Some(outcome.clone())),
            Slot::Waiting(senders) => {
                let (tx, rx) = oneshot::channel();
                senders.retain(|sender| !sender.is_closed());
                senders.push(tx);
                WaiterState::Pending(rx)
            }
        };

        Waiter {
            id: id.clone(),
            slots: Arc::clone(&self.slots),
            state,
        }
    }

    /// Wakes every current subscriber of `id` and retains the outcome.
    ///
    /// Returns the number of subscribers that received it. A second publish for
    /// the same id is ignored.
    pub fn publish(&self, id: &RequestId, outcome: Outcome) -> usize {
        let mut slot = self
            .slots
            .entry(id.clone())
            .or_insert_with(|| Slot::Waiting(Vec::new()));

        let previous = std::mem::replace(&mut *slot, Slot::Delivered(outcome.clone()));
        match previous {
            Slot::Waiting(senders) => senders
                .into_iter()
                .filter(|sender| !sender.is_closed())
                .filter_map(|sender| sender.send(outcome.clone()).ok())
                .count(),
            Slot::Delivered(first) => {
                *slot = Slot::Delivered(first);
                0
            }
        }
    }

    /// Drops whatever is retained for `id`.
    pub fn acknowledge(&self, id: &RequestId) {
        self.slots
            .remove_if(id, |_, slot| matches!(slot, Slot::Delivered(_)));
    }

    pub fn subscriber_count(&self, id: &RequestId) -> usize {
        match self.slots.get(id).as_deref() {
            Some(Slot::Waiting(senders)) => {
                senders.iter().filter(|sender| !sender.is_closed()).count()
            }
            _ => 0,
        }
    }

    pub fn is_delivered(&self, id: &RequestId) -> bool {
        matches!(self.slots.get(id).as_deref(), Some(Slot::Delivered(_)))
    }

    fn prune(slots: &DashMap<RequestId, Slot>, id: &RequestId) {
        if let Some(mut slot) = slots.get_mut(id)
            && let Slot::Waiting(senders) = &mut *slot
        {
            senders.retain(|sender| !sender.is_closed());
        }
        slots.remove_if(id, |_, slot| matches!(slot, Slot::Waiting(senders) if senders.is_empty()));
    }
}

enum WaiterState {
    Ready(Option<Outcome>),
    Pending(oneshot::Receiver<Outcome>),
}

/// Resolves to the published outcome, or `None` if the notifier state was
/// discarded before anything was published.
///
/// Dropping a waiter releases its subscription.
pub struct Waiter {
    id: RequestId,
    slots: Arc<DashMap<RequestId, Slot>>,
    state: WaiterState,
}

impl Future for Waiter {
    type Output = Option<Outcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            WaiterState::Ready(outcome) => Poll::Ready(outcome.take()),
            WaiterState::Pending(rx) => Pin::new(rx).poll(cx).map(|result| result.ok()),
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let WaiterState::Pending(_) = self.state {
            self.state = WaiterState::Ready(None);
            CompletionNotifier::prune(&self.slots, &self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn outcome(id: &str) -> Outcome {
        Outcome {
            request_id: RequestId::new(id),
            category: "pug".to_string(),
            raw_value: U256::from(3u64),
        }
    }

    #[tokio::test]
    async fn test_publish_wakes_all_subscribers() {
        let notifier = CompletionNotifier::new();
        let id = RequestId::new("1");
        let first = notifier.subscribe(&id);
        let second = notifier.subscribe(&id);

        assert_eq!(notifier.publish(&id, outcome("1")), 2);
        assert_eq!(first.await, Some(outcome("1")));
        assert_eq!(second.await, Some(outcome("1")));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_delivered_outcome() {
        let notifier = CompletionNotifier::new();
        let id = RequestId::new("1");
        notifier.publish(&id, outcome("1"));

        assert_eq!(notifier.subscribe(&id).await, Some(outcome("1")));
    }

    #[tokio::test]
    async fn test_second_publish_is_ignored() {
        let notifier = CompletionNotifier::new();
        let id = RequestId::new("1");
        notifier.publish(&id, outcome("1"));

        let mut other = outcome("1");
        other.category = "st-bernard".to_string();
        assert_eq!(notifier.publish(&id, other), 0);
        assert_eq!(notifier.subscribe(&id).await, Some(outcome("1")));
    }

    #[tokio::test]
    async fn test_dropped_waiter_releases_subscription() {
        let notifier = CompletionNotifier::new();
        let id = RequestId::new("1");
        let kept = notifier.subscribe(&id);
        let dropped = notifier.subscribe(&id);
        assert_eq!(notifier.subscriber_count(&id), 2);

        drop(dropped);
        assert_eq!(notifier.subscriber_count(&id), 1);

        drop(kept);
        assert_eq!(notifier.subscriber_count(&id), 0);
        assert!(!notifier.is_delivered(&id));
    }

    #[tokio::test]
    async fn test_acknowledge_discards_outcome() {
        let notifier = CompletionNotifier::new();
        let id = RequestId::new("1");
        notifier.publish(&id, outcome("1"));
        assert!(notifier.is_delivered(&id));

        notifier.acknowledge(&id);
        assert!(!notifier.is_delivered(&id));
    }
}
