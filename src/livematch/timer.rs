use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delivered when a match countdown reaches zero
///
/// The epoch identifies which timer instance fired; the engine ignores
/// expiries whose epoch no longer matches the match's current timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerExpired {
    pub match_id: String,
    pub epoch: u64,
}

/// One deadline-based countdown per match
///
/// Arming a timer for a match supersedes any previous one: the pending wait
/// task is aborted, so at most one expiry can be in flight per match.
/// Deadlines already in the past fire immediately, which is how reloaded
/// snapshots with elapsed timers are driven on restart.
pub struct TimerController {
    expiry_tx: mpsc::UnboundedSender<TimerExpired>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TimerController {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerExpired>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        (
            Self {
                expiry_tx,
                tasks: Mutex::new(HashMap::new()),
            },
            expiry_rx,
        )
    }

    /// Arms (or re-arms) the countdown for a match against an absolute
    /// deadline.
    pub fn arm(&self, match_id: &str, epoch: u64, deadline: DateTime<Utc>) {
        let expired = TimerExpired {
            match_id: match_id.to_string(),
            epoch,
        };
        let sender = self.expiry_tx.clone();

        let remaining_ms = (deadline - Utc::now()).num_milliseconds().max(0) as u64;
        debug!(
            match_id = %match_id,
            epoch = epoch,
            remaining_ms = remaining_ms,
            "Arming match timer"
        );

        let handle = tokio::spawn(async move {
            if remaining_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(remaining_ms)).await;
            }
            // Receiver dropped means the engine is shutting down
            let _ = sender.send(expired);
        });

        let mut tasks = self.tasks.lock().unwrap();
        if let Some(previous) = tasks.insert(match_id.to_string(), handle) {
            previous.abort();
        }
    }

    /// Cancels the pending countdown for a match, if any
    pub fn cancel(&self, match_id: &str) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(handle) = tasks.remove(match_id) {
            debug!(match_id = %match_id, "Cancelling match timer");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn fires_after_the_deadline() {
        let (controller, mut rx) = TimerController::new();
        controller.arm("m-1", 1, Utc::now() + ChronoDuration::milliseconds(20));

        let expired = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timer should fire")
            .unwrap();
        assert_eq!(expired.match_id, "m-1");
        assert_eq!(expired.epoch, 1);
    }

    #[tokio::test]
    async fn past_deadline_fires_immediately() {
        let (controller, mut rx) = TimerController::new();
        controller.arm("m-1", 3, Utc::now() - ChronoDuration::seconds(5));

        let expired = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("elapsed deadline should fire on arm")
            .unwrap();
        assert_eq!(expired.epoch, 3);
    }

    #[tokio::test]
    async fn rearming_supersedes_the_previous_timer() {
        let (controller, mut rx) = TimerController::new();
        controller.arm("m-1", 1, Utc::now() + ChronoDuration::milliseconds(30));
        controller.arm("m-1", 2, Utc::now() + ChronoDuration::milliseconds(60));

        let expired = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("second timer should fire")
            .unwrap();
        assert_eq!(expired.epoch, 2);

        // Nothing else pending
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn cancel_prevents_expiry() {
        let (controller, mut rx) = TimerController::new();
        controller.arm("m-1", 1, Utc::now() + ChronoDuration::milliseconds(30));
        controller.cancel("m-1");

        assert!(timeout(Duration::from_millis(150), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn timers_for_different_matches_are_independent() {
        let (controller, mut rx) = TimerController::new();
        controller.arm("m-1", 1, Utc::now() + ChronoDuration::milliseconds(20));
        controller.arm("m-2", 1, Utc::now() + ChronoDuration::milliseconds(20));
        controller.cancel("m-1");

        let expired = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("m-2 timer should fire")
            .unwrap();
        assert_eq!(expired.match_id, "m-2");
    }
}
