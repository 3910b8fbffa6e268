//! Fan-out of one message to a snapshot of recipients, with per-recipient
//! outcome bookkeeping. One recipient's failure never aborts the job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::outbound::{OutboundSender, SendOutcome};
use super::registry::{RecipientRegistry, RegistryError, TargetFilter};

/// One broadcast run over a target snapshot. Once `completed_at` is set,
/// `sent + failed + skipped == targets`: every target counted exactly
/// once.
#[derive(Debug, Clone)]
pub struct BroadcastJob {
    pub id: Uuid,
    pub filter: TargetFilter,
    pub targets: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BroadcastJob {
    fn new(filter: TargetFilter, targets: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            filter,
            targets,
            sent: 0,
            failed: 0,
            skipped: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Every target accounted for, exactly once.
    pub fn is_accounted(&self) -> bool {
        self.sent + self.failed + self.skipped == self.targets
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }

    /// One-line summary for the owner.
    pub fn summary(&self) -> String {
        let ms = self.elapsed().map(|d| d.num_milliseconds()).unwrap_or(0);
        format!(
            "broadcast to {} ({} targets): {} sent, {} failed, {} skipped in {}ms",
            self.filter.as_str(),
            self.targets,
            self.sent,
            self.failed,
            self.skipped,
            ms,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("could not resolve broadcast targets: {0}")]
    TargetResolution(#[from] RegistryError),
}

/// Dispatches broadcasts in bounded-concurrency batches, with a throttle
/// delay between batches rather than between individual sends.
#[derive(Debug, Clone)]
pub struct BroadcastTracker {
    concurrency: usize,
    batch_delay: Duration,
}

impl BroadcastTracker {
    pub fn new(concurrency: usize, batch_delay_ms: u64) -> Self {
        Self {
            concurrency: concurrency.max(1),
            batch_delay: Duration::from_millis(batch_delay_ms),
        }
    }

    /// Resolve the target snapshot and run the job to completion. Only a
    /// registry resolution error fails the job; an empty snapshot
    /// completes trivially with zero counts.
    pub async fn dispatch(
        &self,
        registry: &Arc<dyn RecipientRegistry>,
        sender: &Arc<dyn OutboundSender>,
        text: &str,
        filter: TargetFilter,
    ) -> Result<BroadcastJob, BroadcastError> {
        let targets = registry.list(filter).await?;
        let mut job = BroadcastJob::new(filter, targets.len());
        tracing::info!(job = %job.id, targets = job.targets, filter = filter.as_str(), "broadcast started");

        for (batch_idx, batch) in targets.chunks(self.concurrency).enumerate() {
            if batch_idx > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let mut inflight = JoinSet::new();
            for recipient in batch {
                let sender = Arc::clone(sender);
                let id = recipient.id.clone();
                let text = text.to_owned();
                inflight.spawn(async move {
                    let outcome = sender.send(&id, &text).await;
                    (id, outcome)
                });
            }

            while let Some(joined) = inflight.join_next().await {
                match joined {
                    Ok((_, SendOutcome::Sent)) => job.sent += 1,
                    Ok((id, SendOutcome::Failed)) => {
                        job.failed += 1;
                        tracing::warn!(recipient = %id, "broadcast send failed, recipient kept");
                    }
                    Ok((id, SendOutcome::PermanentlyUnreachable)) => {
                        job.skipped += 1;
                        tracing::info!(recipient = %id, "recipient unreachable, removing from registry");
                        registry.remove(&id).await;
                    }
                    Err(e) => {
                        job.failed += 1;
                        tracing::warn!(error = %e, "broadcast send task panicked");
                    }
                }
            }
        }

        job.completed_at = Some(Utc::now());
        debug_assert!(job.is_accounted());
        tracing::info!(
            job = %job.id,
            sent = job.sent,
            failed = job.failed,
            skipped = job.skipped,
            elapsed_ms = job.elapsed().map(|d| d.num_milliseconds()).unwrap_or(0),
            "broadcast complete"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::registry::{InMemoryRegistry, Recipient};
    use crate::types::{ChatKind, ConversationId};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s)
    }

    /// Sender whose outcome per recipient is scripted; unlisted
    /// recipients succeed.
    struct MapSender {
        outcomes: HashMap<ConversationId, SendOutcome>,
        calls: AtomicUsize,
    }

    impl MapSender {
        fn new(outcomes: HashMap<ConversationId, SendOutcome>) -> Self {
            Self { outcomes, calls: AtomicUsize::new(0) }
        }

        fn all_ok() -> Self {
            Self::new(HashMap::new())
        }
    }

    #[async_trait]
    impl OutboundSender for MapSender {
        async fn send(&self, recipient: &ConversationId, _text: &str) -> SendOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.get(recipient).copied().unwrap_or(SendOutcome::Sent)
        }
    }

    struct FailingRegistry;

    #[async_trait]
    impl RecipientRegistry for FailingRegistry {
        async fn list(&self, _filter: TargetFilter) -> Result<Vec<Recipient>, RegistryError> {
            Err(RegistryError::Unavailable("registry offline".into()))
        }
        async fn remove(&self, _id: &ConversationId) {}
        async fn record_activity(&self, _id: &ConversationId, _kind: ChatKind) {}
    }

    async fn registry_with_users(n: usize) -> Arc<InMemoryRegistry> {
        let reg = Arc::new(InMemoryRegistry::new());
        for i in 0..n {
            reg.record_activity(&id(&format!("u{i}")), ChatKind::Private).await;
        }
        reg
    }

    #[tokio::test]
    async fn empty_snapshot_completes_trivially() {
        let registry: Arc<dyn RecipientRegistry> = Arc::new(InMemoryRegistry::new());
        let sender: Arc<dyn OutboundSender> = Arc::new(MapSender::all_ok());
        let tracker = BroadcastTracker::new(4, 0);

        let job = tracker.dispatch(&registry, &sender, "hi", TargetFilter::All).await.unwrap();
        assert_eq!((job.targets, job.sent, job.failed, job.skipped), (0, 0, 0, 0));
        assert!(job.is_accounted());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn every_target_counted_exactly_once() {
        let registry = registry_with_users(9).await;
        let registry_dyn: Arc<dyn RecipientRegistry> = registry.clone();
        let sender = Arc::new(MapSender::all_ok());
        let sender_dyn: Arc<dyn OutboundSender> = sender.clone();
        // Concurrency smaller than the target count forces multiple batches
        let tracker = BroadcastTracker::new(4, 0);

        let job =
            tracker.dispatch(&registry_dyn, &sender_dyn, "hi", TargetFilter::All).await.unwrap();
        assert_eq!(job.targets, 9);
        assert_eq!(job.sent, 9);
        assert!(job.is_accounted());
        assert_eq!(sender.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn blocked_recipient_is_skipped_and_removed() {
        let registry = registry_with_users(5).await;
        let registry_dyn: Arc<dyn RecipientRegistry> = registry.clone();
        let sender: Arc<dyn OutboundSender> = Arc::new(MapSender::new(HashMap::from([(
            id("u2"),
            SendOutcome::PermanentlyUnreachable,
        )])));
        let tracker = BroadcastTracker::new(8, 0);

        let job =
            tracker.dispatch(&registry_dyn, &sender, "hi", TargetFilter::All).await.unwrap();
        assert_eq!((job.sent, job.failed, job.skipped), (4, 0, 1));
        assert!(job.is_accounted());
        // u2 is gone from the registry
        let remaining = registry.list(TargetFilter::All).await.unwrap();
        assert_eq!(remaining.len(), 4);
        assert!(remaining.iter().all(|r| r.id != id("u2")));
    }

    #[tokio::test]
    async fn transient_failures_keep_the_recipient_and_the_job_running() {
        let registry = registry_with_users(4).await;
        let registry_dyn: Arc<dyn RecipientRegistry> = registry.clone();
        let sender: Arc<dyn OutboundSender> = Arc::new(MapSender::new(HashMap::from([
            (id("u0"), SendOutcome::Failed),
            (id("u3"), SendOutcome::Failed),
        ])));
        let tracker = BroadcastTracker::new(2, 0);

        let job =
            tracker.dispatch(&registry_dyn, &sender, "hi", TargetFilter::All).await.unwrap();
        assert_eq!((job.sent, job.failed, job.skipped), (2, 2, 0));
        assert!(job.is_accounted());
        // Failed recipients stay registered for future broadcasts
        assert_eq!(registry.len(), 4);
    }

    #[tokio::test]
    async fn filter_narrows_the_snapshot() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.record_activity(&id("u1"), ChatKind::Private).await;
        registry.record_activity(&id("g1"), ChatKind::Group).await;
        registry.record_activity(&id("g2"), ChatKind::Group).await;
        let registry_dyn: Arc<dyn RecipientRegistry> = registry.clone();
        let sender: Arc<dyn OutboundSender> = Arc::new(MapSender::all_ok());
        let tracker = BroadcastTracker::new(4, 0);

        let job = tracker
            .dispatch(&registry_dyn, &sender, "hi", TargetFilter::GroupsOnly)
            .await
            .unwrap();
        assert_eq!(job.targets, 2);
        assert_eq!(job.sent, 2);
    }

    #[tokio::test]
    async fn registry_error_is_a_job_level_error() {
        let registry: Arc<dyn RecipientRegistry> = Arc::new(FailingRegistry);
        let sender: Arc<dyn OutboundSender> = Arc::new(MapSender::all_ok());
        let tracker = BroadcastTracker::new(4, 0);

        let err = tracker.dispatch(&registry, &sender, "hi", TargetFilter::All).await;
        assert!(matches!(err, Err(BroadcastError::TargetResolution(_))));
    }

    #[test]
    fn summary_reports_counts() {
        let mut job = BroadcastJob::new(TargetFilter::All, 3);
        job.sent = 2;
        job.skipped = 1;
        job.completed_at = Some(job.started_at);
        let summary = job.summary();
        assert!(summary.contains("2 sent"));
        assert!(summary.contains("1 skipped"));
    }
}
