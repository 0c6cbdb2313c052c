//! Scripted terminal for exercising the session without a PTY.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use termtap_common::mutex_lock_or_recover;

use crate::control::ControlSignal;
use crate::source::{SnapshotSource, SourceError};

/// A terminal whose buffer follows a script.
///
/// Each `snapshot` call advances to the next queued frame, then keeps
/// returning the last one (a stable buffer). Frames queued with
/// `on_submit` are released only once a command has been submitted.
/// With `hang_submissions` set, `submit` records the command and then never
/// resolves, like a command that never stops printing.
pub struct ScriptedSource {
    state: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    current: String,
    frames: VecDeque<String>,
    submit_frames: VecDeque<String>,
    submitted: Vec<String>,
    controls: Vec<ControlSignal>,
    snapshot_calls: usize,
    fail_snapshots: bool,
    snapshots_until_failure: Option<usize>,
    fail_submissions: bool,
    hang_submissions: bool,
}

impl ScriptedSource {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                current: initial.into(),
                ..ScriptState::default()
            }),
        }
    }

    pub fn push_frames<I, T>(&self, frames: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut state = mutex_lock_or_recover(&self.state);
        state.frames.extend(frames.into_iter().map(Into::into));
    }

    pub fn on_submit<I, T>(&self, frames: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut state = mutex_lock_or_recover(&self.state);
        state.submit_frames.extend(frames.into_iter().map(Into::into));
    }

    /// Clears any countdown set by `fail_snapshots_after` too.
    pub fn fail_snapshots(&self, fail: bool) {
        let mut state = mutex_lock_or_recover(&self.state);
        state.fail_snapshots = fail;
        state.snapshots_until_failure = None;
    }

    /// Lets `count` more snapshots succeed, then fails every one after.
    pub fn fail_snapshots_after(&self, count: usize) {
        mutex_lock_or_recover(&self.state).snapshots_until_failure = Some(count);
    }

    pub fn hang_submissions(&self, hang: bool) {
        mutex_lock_or_recover(&self.state).hang_submissions = hang;
    }

    pub fn fail_submissions(&self, fail: bool) {
        mutex_lock_or_recover(&self.state).fail_submissions = fail;
    }

    pub fn submitted(&self) -> Vec<String> {
        mutex_lock_or_recover(&self.state).submitted.clone()
    }

    pub fn controls(&self) -> Vec<ControlSignal> {
        mutex_lock_or_recover(&self.state).controls.clone()
    }

    pub fn snapshot_calls(&self) -> usize {
        mutex_lock_or_recover(&self.state).snapshot_calls
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn snapshot(&self) -> Result<String, SourceError> {
        let mut state = mutex_lock_or_recover(&self.state);
        if state.fail_snapshots || state.snapshots_until_failure == Some(0) {
            return Err(SourceError::Snapshot("scripted snapshot failure".into()));
        }
        if let Some(remaining) = state.snapshots_until_failure.as_mut() {
            *remaining -= 1;
        }
        state.snapshot_calls += 1;
        if let Some(frame) = state.frames.pop_front() {
            state.current = frame;
        }
        Ok(state.current.clone())
    }

    async fn submit(&self, command: &str) -> Result<(), SourceError> {
        self.dispatch(command).await?;
        let hang = mutex_lock_or_recover(&self.state).hang_submissions;
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn dispatch(&self, command: &str) -> Result<(), SourceError> {
        let mut state = mutex_lock_or_recover(&self.state);
        if state.fail_submissions {
            return Err(SourceError::Submission("scripted submit failure".into()));
        }
        state.submitted.push(command.to_string());
        let released: Vec<String> = state.submit_frames.drain(..).collect();
        state.frames.extend(released);
        Ok(())
    }

    async fn send_control(&self, signal: ControlSignal) -> Result<(), SourceError> {
        mutex_lock_or_recover(&self.state).controls.push(signal);
        Ok(())
    }
}
