//! Notification webhook
//!
//! Best-effort event delivery to an external webhook. A failed or slow
//! delivery is logged and dropped; it never rolls back or delays the ledger
//! transaction that produced the event.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Serialize)]
struct NotifyEvent {
    event: &'static str,
    session_id: i64,
    learner_id: i64,
    teacher_id: i64,
    credits_amount: i64,
    timestamp: i64,
}

/// Fire-and-forget webhook client. Cheap to clone; does nothing when no
/// webhook URL is configured.
#[derive(Clone)]
pub struct Notifier {
    inner: Option<Arc<NotifierInner>>,
}

struct NotifierInner {
    client: reqwest::Client,
    url: String,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let inner = webhook_url.map(|url| {
            Arc::new(NotifierInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(5))
                    .build()
                    .unwrap_or_default(),
                url,
            })
        });
        Self { inner }
    }

    /// Disabled notifier for tests and webhook-less deployments
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn session_completed(&self, session: &shared::models::SkillSession) {
        self.send("session_completed", session);
    }

    pub fn session_cancelled(&self, session: &shared::models::SkillSession) {
        self.send("session_cancelled", session);
    }

    fn send(&self, event: &'static str, session: &shared::models::SkillSession) {
        let Some(inner) = self.inner.clone() else {
            return;
        };
        let payload = NotifyEvent {
            event,
            session_id: session.id,
            learner_id: session.learner_id,
            teacher_id: session.teacher_id,
            credits_amount: session.credits_amount,
            timestamp: shared::util::now_millis(),
        };
        tokio::spawn(async move {
            match inner.client.post(&inner.url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(event, "Webhook delivered");
                }
                Ok(resp) => {
                    tracing::warn!(event, status = %resp.status(), "Webhook rejected");
                }
                Err(e) => {
                    tracing::warn!(event, error = %e, "Webhook delivery failed");
                }
            }
        });
    }
}
