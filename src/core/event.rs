//! Extendable lifecycle events
//!
//! The host keeps a worker alive only while an event is outstanding. Every
//! piece of asynchronous work started while handling an event must be
//! registered here so that `settle` can wait for it.

use std::future::Future;

use log::{debug, error};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::error::WorkerResult;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Message,
    Sync,
    PeriodicSync,
    Push,
    PushSubscriptionChange,
    NotificationClick,
    Error,
    UnhandledRejection,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Message => "message",
            EventKind::Sync => "sync",
            EventKind::PeriodicSync => "periodicsync",
            EventKind::Push => "push",
            EventKind::PushSubscriptionChange => "pushsubscriptionchange",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Error => "error",
            EventKind::UnhandledRejection => "unhandledrejection",
        }
    }
}

/// Outcome of waiting for an event's registered work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettleReport {
    pub completed: usize,
    pub failed: usize,
}

/// An event whose lifetime is extended by the work registered on it.
pub struct ExtendableEvent {
    id: Uuid,
    kind: EventKind,
    tasks: JoinSet<WorkerResult<()>>,
}

impl ExtendableEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            tasks: JoinSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Register background work. Must be called from within a tokio runtime.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = WorkerResult<()>> + Send + 'static,
    {
        self.tasks.spawn(work);
    }

    /// Number of registered tasks that have not been collected yet.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every registered task. Failures are logged as unhandled
    /// rejections and never propagated.
    pub async fn settle(mut self) -> SettleReport {
        let mut report = SettleReport::default();

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => report.completed += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    metrics::record_unhandled_rejection(self.kind.as_str());
                    error!(
                        event = self.kind.as_str(), event_id:% = self.id;
                        "Unhandled rejection in extended work: {e}"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_unhandled_rejection(self.kind.as_str());
                    error!(
                        event = self.kind.as_str(), event_id:% = self.id;
                        "Extended work aborted: {e}"
                    );
                }
            }
        }

        debug!(
            "Event {} ({}) settled: {} completed, {} failed",
            self.kind.as_str(),
            self.id,
            report.completed,
            report.failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkerError;

    #[tokio::test]
    async fn test_settle_waits_for_all_work() {
        let mut event = ExtendableEvent::new(EventKind::Fetch);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for i in 0..3 {
            let tx = tx.clone();
            event.wait_until(async move {
                tokio::task::yield_now().await;
                tx.send(i).ok();
                Ok(())
            });
        }
        drop(tx);

        assert_eq!(event.pending(), 3);
        let report = event.settle().await;
        assert_eq!(report, SettleReport { completed: 3, failed: 0 });

        let mut seen = Vec::new();
        while let Some(i) = rx.recv().await {
            seen.push(i);
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_settle_swallows_failures() {
        let mut event = ExtendableEvent::new(EventKind::Message);
        event.wait_until(async { Err(WorkerError::Network("offline".to_string())) });
        event.wait_until(async { Ok(()) });

        let report = event.settle().await;
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);
    }
}
