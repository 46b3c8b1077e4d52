//! Raised-hand queue and its spoken notifications.
//!
//! `HandRaiseQueue` is the pure policy: every transition returns the cues the
//! notifier must act on. `HandRaiseNotifier` owns the delayed announcement
//! and turns cues into speech.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::schedule::ScheduledTask;
use crate::speech::Announcer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandCue {
    /// (Re)schedule the individual announcement for this identity.
    Schedule(String),
    /// Cancel any pending individual announcement.
    Cancel,
    /// Announce that this many hands are raised.
    Batch(usize),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandRaiseQueue {
    queue: Vec<String>,
    threshold: usize,
    batch_announced: bool,
}

impl HandRaiseQueue {
    pub fn new(threshold: usize) -> Self {
        Self {
            queue: Vec::new(),
            threshold: threshold.max(1),
            batch_announced: false,
        }
    }

    pub fn raise(&mut self, identity: &str) -> Vec<HandCue> {
        if self.contains(identity) {
            debug!("{} already in the hand queue", identity);
            return Vec::new();
        }
        let previous_head = self.head().map(str::to_string);
        self.queue.push(identity.to_string());
        self.evaluate(previous_head)
    }

    pub fn lower(&mut self, identity: &str) -> Vec<HandCue> {
        let Some(index) = self.queue.iter().position(|i| i == identity) else {
            return Vec::new();
        };
        let previous_head = self.head().map(str::to_string);
        self.queue.remove(index);
        self.evaluate(previous_head)
    }

    fn evaluate(&mut self, previous_head: Option<String>) -> Vec<HandCue> {
        let Some(head) = self.head() else {
            self.batch_announced = false;
            return vec![HandCue::Cancel];
        };

        if self.batch_announced {
            return Vec::new();
        }

        if self.queue.len() >= self.threshold {
            self.batch_announced = true;
            return vec![HandCue::Cancel, HandCue::Batch(self.queue.len())];
        }

        if previous_head.as_deref() != Some(head) {
            return vec![HandCue::Schedule(head.to_string())];
        }

        Vec::new()
    }

    pub fn head(&self) -> Option<&str> {
        self.queue.first().map(String::as_str)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.queue.iter().any(|i| i == identity)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn identities(&self) -> &[String] {
        &self.queue
    }
}

pub fn individual_announcement(name: &str) -> String {
    format!(
        "{}, you raised your hand. Do you have any doubts? If so, please click the 'Ask a Doubt' button to submit your question.",
        name
    )
}

pub fn batch_announcement(count: usize) -> String {
    format!("{} students have raised their hands.", count)
}

/// Teacher-side queue plus the single pending announcement it may own.
pub struct HandRaiseNotifier {
    queue: HandRaiseQueue,
    pending: ScheduledTask,
    announcer: Announcer,
    delay: Duration,
}

impl HandRaiseNotifier {
    pub fn new(announcer: Announcer, threshold: usize, delay: Duration) -> Self {
        Self {
            queue: HandRaiseQueue::new(threshold),
            pending: ScheduledTask::new(),
            announcer,
            delay,
        }
    }

    /// Returns the identity whose individual announcement this raise
    /// scheduled, if any. Suppressed and batch raises return `None`.
    pub fn raise(&mut self, identity: &str) -> Option<String> {
        let cues = self.queue.raise(identity);
        let scheduled = cues.iter().find_map(|cue| match cue {
            HandCue::Schedule(name) => Some(name.clone()),
            _ => None,
        });
        self.apply(cues);
        scheduled
    }

    pub fn lower(&mut self, identity: &str) {
        let cues = self.queue.lower(identity);
        self.apply(cues);
    }

    pub fn queue(&self) -> &HandRaiseQueue {
        &self.queue
    }

    /// Drops the scheduled individual announcement because the caller is
    /// speaking it now.
    pub fn claim_announcement(&mut self) -> bool {
        self.pending.cancel()
    }

    pub fn has_pending_announcement(&self) -> bool {
        self.pending.is_pending()
    }

    fn apply(&mut self, cues: Vec<HandCue>) {
        for cue in cues {
            match cue {
                HandCue::Schedule(name) => {
                    debug!("Scheduling hand-raise announcement for {}", name);
                    let announcer = self.announcer.clone();
                    let text = individual_announcement(&name);
                    self.pending.schedule(self.delay, async move {
                        let _ = announcer.speak(&text).await;
                    });
                }
                HandCue::Cancel => {
                    if self.pending.cancel() {
                        debug!("Canceled pending hand-raise announcement");
                    }
                }
                HandCue::Batch(count) => {
                    info!("{} hands raised, announcing batch", count);
                    self.announcer.announce(batch_announcement(count));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSpeaker;

    #[test]
    fn test_duplicate_raise_is_idempotent() {
        let mut queue = HandRaiseQueue::new(5);
        assert_eq!(queue.raise("Alice"), vec![HandCue::Schedule("Alice".into())]);
        assert!(queue.raise("Alice").is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_second_raise_keeps_head() {
        let mut queue = HandRaiseQueue::new(5);
        queue.raise("Alice");
        assert!(queue.raise("Bob").is_empty());
        assert_eq!(queue.lower("Alice"), vec![HandCue::Schedule("Bob".into())]);
        assert_eq!(queue.lower("Bob"), vec![HandCue::Cancel]);
        assert!(queue.lower("Bob").is_empty());
    }

    #[test]
    fn test_batch_fires_once_per_cycle() {
        let mut queue = HandRaiseQueue::new(3);
        queue.raise("a");
        queue.raise("b");
        assert_eq!(queue.raise("c"), vec![HandCue::Cancel, HandCue::Batch(3)]);
        assert!(queue.raise("d").is_empty());
        assert!(queue.lower("a").is_empty());
        assert!(queue.lower("b").is_empty());
        assert!(queue.lower("c").is_empty());
        assert_eq!(queue.lower("d"), vec![HandCue::Cancel]);

        assert_eq!(queue.raise("e"), vec![HandCue::Schedule("e".into())]);
        queue.raise("f");
        assert_eq!(queue.raise("g"), vec![HandCue::Cancel, HandCue::Batch(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_individual_announcement_after_delay() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 5, Duration::from_secs(3));

        notifier.raise("Alice");
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(speaker.started().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(speaker.started(), vec![individual_announcement("Alice")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_head_change_reschedules() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 5, Duration::from_secs(3));

        notifier.raise("Alice");
        notifier.raise("Bob");
        tokio::time::sleep(Duration::from_secs(1)).await;
        notifier.lower("Alice");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(speaker.started(), vec![individual_announcement("Bob")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emptying_queue_cancels_pending() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 5, Duration::from_secs(3));

        notifier.raise("Alice");
        tokio::time::sleep(Duration::from_secs(1)).await;
        notifier.lower("Alice");
        assert!(!notifier.has_pending_announcement());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(speaker.started().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_raises_announce_one_batch() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 5, Duration::from_secs(3));

        for name in ["Alice", "Bob", "Carol", "Dan", "Eve"] {
            notifier.raise(name);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(speaker.started(), vec![batch_announcement(5)]);

        for name in ["Alice", "Bob", "Carol", "Dan"] {
            notifier.lower(name);
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(speaker.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raise_reports_scheduled_head_only() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 3, Duration::from_secs(3));

        assert_eq!(notifier.raise("Alice"), Some("Alice".to_string()));
        assert_eq!(notifier.raise("Bob"), None);
        assert_eq!(notifier.raise("Carol"), None);
        assert_eq!(notifier.raise("Dan"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claimed_announcement_is_not_repeated() {
        let speaker = RecordingSpeaker::new(Duration::from_millis(10));
        let mut notifier =
            HandRaiseNotifier::new(Announcer::new(speaker.clone()), 5, Duration::from_secs(3));

        notifier.raise("Alice");
        assert!(notifier.claim_announcement());
        assert!(!notifier.has_pending_announcement());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(speaker.started().is_empty());
    }
}
