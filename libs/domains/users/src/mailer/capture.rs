//! In-process mailer for tests and local development

use super::{MailError, Mailer, OutgoingMail};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Messages kept by [`CapturingMailer::new`]
pub const DEFAULT_CAPTURE_LIMIT: usize = 100;

/// Logs messages instead of sending them and keeps the most recent ones.
///
/// Older messages are discarded once `limit` is reached, so a long-running
/// development server does not grow without bound.
#[derive(Clone)]
pub struct CapturingMailer {
    sent: Arc<Mutex<VecDeque<OutgoingMail>>>,
    limit: usize,
    failure: Option<String>,
}

impl Default for CapturingMailer {
    fn default() -> Self {
        Self::with_limit(DEFAULT_CAPTURE_LIMIT)
    }
}

impl CapturingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` messages (at least one)
    pub fn with_limit(limit: usize) -> Self {
        Self {
            sent: Arc::default(),
            limit: limit.max(1),
            failure: None,
        }
    }

    /// A mailer whose every send fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.iter().cloned().collect()
    }

    pub async fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|mail| mail.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if let Some(message) = &self.failure {
            return Err(MailError::Transport(message.clone()));
        }

        tracing::info!(to = %mail.to, subject = %mail.subject, "Captured outgoing mail");
        let mut sent = self.sent.lock().await;
        if sent.len() == self.limit {
            sent.pop_front();
        }
        sent.push_back(mail);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}
