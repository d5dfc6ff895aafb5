//! Interval refresh for queries bound to the current screen.

use super::{QueryBinding, QueryKey};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Sends a "poll due" event for one key on a fixed interval until cancelled
/// or dropped. The first event fires one full interval after spawning, since
/// entering a screen already fetches its data.
pub struct Poller {
    key: QueryKey,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<E, F>(key: QueryKey, every: Duration, tx: UnboundedSender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn(QueryKey) -> E + Send + 'static,
    {
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(make_event(task_key.clone())).is_err() {
                    break;
                }
            }
        });
        debug!(%key, ?every, "poller started");
        Self {
            key,
            handle: Some(handle),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(key = %self.key, "poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The set of pollers belonging to the visible screen.
#[derive(Default)]
pub struct PollSchedule {
    pollers: Vec<Poller>,
}

impl PollSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop every running poller and start one per polled binding.
    pub fn replace<E, F>(&mut self, bindings: &[QueryBinding], tx: &UnboundedSender<E>, make_event: F)
    where
        E: Send + 'static,
        F: Fn(QueryKey) -> E + Send + Clone + 'static,
    {
        self.clear();
        for binding in bindings {
            if let Some(every) = binding.poll {
                self.pollers.push(Poller::spawn(
                    binding.key.clone(),
                    every,
                    tx.clone(),
                    make_event.clone(),
                ));
            }
        }
    }

    pub fn clear(&mut self) {
        for poller in self.pollers.iter_mut() {
            poller.cancel();
        }
        self.pollers.clear();
    }

    pub fn keys(&self) -> Vec<&QueryKey> {
        self.pollers.iter().map(Poller::key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_poller_fires_repeatedly() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _poller = Poller::spawn(QueryKey::Notifications, Duration::from_millis(10), tx, |k| k);
        assert_eq!(rx.recv().await, Some(QueryKey::Notifications));
        assert_eq!(rx.recv().await, Some(QueryKey::Notifications));
    }

    #[tokio::test]
    async fn test_dropping_poller_stops_events() {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueryKey>();
        let poller = Poller::spawn(QueryKey::Dashboard, Duration::from_millis(10), tx, |k| k);
        drop(poller);
        // The aborted task drops its sender, closing the channel
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_schedule_replace_only_polls_timed_bindings() {
        let (tx, _rx) = mpsc::unbounded_channel::<QueryKey>();
        let mut schedule = PollSchedule::new();
        schedule.replace(
            &[
                QueryBinding::polled(QueryKey::Dashboard, Duration::from_secs(30)),
                QueryBinding::once(QueryKey::TeamMembers),
                QueryBinding::polled(QueryKey::Notifications, Duration::from_secs(10)),
            ],
            &tx,
            |k| k,
        );
        assert_eq!(
            schedule.keys(),
            vec![&QueryKey::Dashboard, &QueryKey::Notifications]
        );

        schedule.replace(&[QueryBinding::once(QueryKey::Feedback)], &tx, |k| k);
        assert!(schedule.keys().is_empty());
    }
}
