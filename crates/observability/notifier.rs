use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, warn};

const QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub(crate) struct SpanFields {
    pub(crate) name: String,
    pub(crate) fields: BTreeMap<String, String>,
}

/// A log event that crossed the alert threshold, already redacted.
#[derive(Clone, Debug)]
pub(crate) struct AlertEvent {
    pub(crate) level: Level,
    pub(crate) at: DateTime<Utc>,
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) spans: Vec<SpanFields>,
}

impl AlertEvent {
    /// Payment identifiers pulled from the event or its spans, for the alert headline.
    pub(crate) fn payment_ref(&self) -> Option<&str> {
        const KEYS: [&str; 3] = ["payment_id", "job_id", "md_order"];
        KEYS.iter().find_map(|key| {
            self.fields
                .get(*key)
                .or_else(|| self.spans.iter().rev().find_map(|span| span.fields.get(*key)))
                .map(String::as_str)
        })
    }
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn deliver(&self, event: &AlertEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Queues alerts off the logging path and fans them out to sinks on a background task.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.deliver(&event).await {
                        warn!(sink = sink.name(), error = %error, "alerts: sink delivery failed");
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn dispatch(&self, event: AlertEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            warn!(reason, "alerts: dropping event");
        }
    }
}
