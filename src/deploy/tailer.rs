// ABOUTME: Background poller that streams a service's lifecycle events.
// ABOUTME: Prints only events newer than its watermark and flushes once more on cancellation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cluster::{ControlPlaneError, ServiceEvent, ServiceOps};
use crate::output::Output;
use crate::types::ServiceName;

/// Shortest interval the tailer will poll at.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// What a tailer did over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailSummary {
    /// Events printed.
    pub printed: usize,
    /// Polls that failed.
    pub failed_polls: usize,
    /// Most recent poll error, if any.
    pub last_error: Option<String>,
}

/// Polls one service's events and prints the new ones.
pub struct StatusTailer<C> {
    control_plane: Arc<C>,
    cluster: String,
    service: ServiceName,
    interval: Duration,
    watermark: DateTime<Utc>,
    output: Output,
}

impl<C: ServiceOps + 'static> StatusTailer<C> {
    /// Create a tailer whose watermark starts now, so history is not replayed.
    pub fn new(
        control_plane: Arc<C>,
        cluster: impl Into<String>,
        service: ServiceName,
        interval: Duration,
        output: Output,
    ) -> Self {
        Self {
            control_plane,
            cluster: cluster.into(),
            service,
            interval: interval.max(MIN_INTERVAL),
            watermark: Utc::now(),
            output,
        }
    }

    /// Start from `watermark` instead of now.
    pub fn since(mut self, watermark: DateTime<Utc>) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// Fetch events once, print the ones strictly newer than the watermark in
    /// ascending order, and advance the watermark past them.
    pub async fn poll_once(&mut self) -> Result<Vec<ServiceEvent>, ControlPlaneError> {
        let mut events = self
            .control_plane
            .list_service_events(&self.cluster, &self.service)
            .await?;

        events.retain(|event| event.created_at > self.watermark);
        events.sort_by_key(|event| event.created_at);

        for event in &events {
            self.output.event(&self.service, event);
        }

        if let Some(newest) = events.last() {
            self.watermark = newest.created_at;
        }

        Ok(events)
    }

    /// Poll every interval until `cancel` fires, then poll one final time.
    pub async fn run(mut self, cancel: CancellationToken) -> TailSummary {
        let mut summary = TailSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.record(&mut summary).await,
            }
        }

        self.record(&mut summary).await;
        tracing::debug!(
            service = %self.service,
            printed = summary.printed,
            failed_polls = summary.failed_polls,
            "status tailer stopped"
        );
        summary
    }

    async fn record(&mut self, summary: &mut TailSummary) {
        match self.poll_once().await {
            Ok(events) => summary.printed += events.len(),
            Err(e) => {
                tracing::debug!(service = %self.service, error = %e, "event poll failed");
                summary.failed_polls += 1;
                summary.last_error = Some(e.to_string());
            }
        }
    }
}
