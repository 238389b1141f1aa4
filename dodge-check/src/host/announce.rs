//! Result Announcement
//!
//! Formats an outcome as the chat card posted after a session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::game::score::OutcomeRecord;
use crate::host::Announcer;

/// Name used when the subject cannot be resolved.
pub const FALLBACK_SUBJECT_NAME: &str = "Player";

/// Human-readable result card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatCard {
    /// Character name
    pub subject_name: String,
    /// The outcome being announced
    pub outcome: OutcomeRecord,
    /// When the card was produced
    pub resolved_at: DateTime<Utc>,
}

impl ChatCard {
    /// Build a card stamped with the current time.
    pub fn new(outcome: &OutcomeRecord, subject_name: &str) -> Self {
        Self {
            subject_name: subject_name.to_string(),
            outcome: outcome.clone(),
            resolved_at: Utc::now(),
        }
    }

    /// Verdict line.
    pub fn verdict(&self) -> &'static str {
        if self.outcome.success {
            "SUCCESS"
        } else {
            "FAILURE"
        }
    }
}

impl fmt::Display for ChatCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stealth Check: {}", self.subject_name)?;
        writeln!(f, "Time survived: {:.1}s", self.outcome.survived_seconds)?;
        writeln!(f, "+ Bonus: {}", self.outcome.applied_bonus)?;
        writeln!(
            f,
            "Result: {} vs DC {}",
            self.outcome.result_score, self.outcome.difficulty_class
        )?;
        write!(f, "{}", self.verdict())
    }
}

/// Announcer that writes the card to the log.
#[derive(Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&mut self, outcome: &OutcomeRecord, subject_name: &str) {
        let card = ChatCard::new(outcome, subject_name);
        info!(
            subject = %outcome.subject_ref,
            result = outcome.result_score,
            dc = outcome.difficulty_class,
            success = outcome.success,
            "\n{card}"
        );
    }
}

/// Announcer that forwards cards to a queue.
#[derive(Debug, Clone)]
pub struct ChannelAnnouncer {
    tx: mpsc::UnboundedSender<ChatCard>,
}

impl ChannelAnnouncer {
    /// Create an announcer and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatCard>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Announcer for ChannelAnnouncer {
    fn announce(&mut self, outcome: &OutcomeRecord, subject_name: &str) {
        if self.tx.send(ChatCard::new(outcome, subject_name)).is_err() {
            warn!(subject = %outcome.subject_ref, "announcement receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::SubjectRef;

    fn outcome(success: bool) -> OutcomeRecord {
        OutcomeRecord {
            subject_ref: SubjectRef::new("actor-1"),
            survived_seconds: 12.74,
            applied_bonus: 3,
            result_score: 15,
            difficulty_class: if success { 15 } else { 16 },
            success,
        }
    }

    #[test]
    fn test_card_text() {
        let card = ChatCard::new(&outcome(true), "Vex");
        let text = card.to_string();

        assert!(text.starts_with("Stealth Check: Vex"));
        assert!(text.contains("Time survived: 12.7s"));
        assert!(text.contains("+ Bonus: 3"));
        assert!(text.contains("Result: 15 vs DC 15"));
        assert!(text.ends_with("SUCCESS"));
    }

    #[test]
    fn test_card_failure() {
        let card = ChatCard::new(&outcome(false), FALLBACK_SUBJECT_NAME);
        assert_eq!(card.verdict(), "FAILURE");
        assert!(card.to_string().contains("vs DC 16"));
    }

    #[tokio::test]
    async fn test_channel_announcer() {
        let (mut announcer, mut rx) = ChannelAnnouncer::new();
        announcer.announce(&outcome(true), "Vex");

        let card = rx.recv().await.unwrap();
        assert_eq!(card.subject_name, "Vex");
        assert_eq!(card.outcome.result_score, 15);
    }
}
