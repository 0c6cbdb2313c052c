use std::sync::Arc;
use std::time::Duration;

use crate::sleeper::{Sleeper, TokioSleeper};
use crate::source::{SnapshotSource, SourceError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Declares a command finished once the buffer holds still for one window.
///
/// Output arrives in bursts, so a single sample cannot tell "done" from
/// "between chunks". Two samples a debounce window apart can, heuristically:
/// a command that pauses longer than the window reads as complete, and one
/// that never pauses never does.
#[derive(Clone)]
pub struct CompletionDetector {
    debounce: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl CompletionDetector {
    pub fn new(debounce: Duration) -> Self {
        Self::with_sleeper(debounce, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(debounce: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { debounce, sleeper }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub async fn is_complete<S>(&self, source: &S) -> Result<bool, SourceError>
    where
        S: SnapshotSource + ?Sized,
    {
        let first = source.snapshot().await?;
        self.sleeper.sleep(self.debounce).await;
        let second = source.snapshot().await?;
        Ok(first == second)
    }
}

impl std::fmt::Debug for CompletionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionDetector")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::MockSleeper;
    use crate::test_support::ScriptedSource;

    fn detector(sleeper: &Arc<MockSleeper>) -> CompletionDetector {
        CompletionDetector::with_sleeper(DEFAULT_DEBOUNCE, sleeper.clone())
    }

    #[tokio::test]
    async fn test_stable_buffer_is_complete() {
        let sleeper = Arc::new(MockSleeper::new());
        let source = ScriptedSource::new("$ sleep 1\n$ ");

        assert!(detector(&sleeper).is_complete(&source).await.unwrap());
        assert_eq!(sleeper.durations(), vec![DEFAULT_DEBOUNCE]);
        assert_eq!(source.snapshot_calls(), 2);
    }

    #[tokio::test]
    async fn test_changing_buffer_is_not_complete() {
        let sleeper = Arc::new(MockSleeper::new());
        let source = ScriptedSource::new("");
        source.push_frames(["building 1/2", "building 2/2"]);

        assert!(!detector(&sleeper).is_complete(&source).await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_failure_propagates() {
        let sleeper = Arc::new(MockSleeper::new());
        let source = ScriptedSource::new("$ ");
        source.fail_snapshots(true);

        let err = detector(&sleeper).is_complete(&source).await.unwrap_err();
        assert!(matches!(err, SourceError::Snapshot(_)));
        assert_eq!(sleeper.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_detector_waits_one_window() {
        let source = ScriptedSource::new("$ ");
        let start = tokio::time::Instant::now();

        assert!(CompletionDetector::default()
            .is_complete(&source)
            .await
            .unwrap());
        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
    }
}
