//! Test-only scripted doubles for the model and session collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::report::SessionSnapshot;
use crate::core::transcript::Turn;
use crate::io::model::ChatModel;
use crate::io::session::VizSession;

/// One scripted model response.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this reply text.
    Reply(String),
    /// Fail the call with this message (transport failure).
    Fail(String),
}

/// [`ChatModel`] double returning predetermined replies in order.
///
/// Records the transcript length seen by each call so tests can assert on
/// what the model was shown.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: RefCell<VecDeque<ScriptedReply>>,
    seen: RefCell<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| ScriptedReply::Reply((*r).to_string()))
                .collect(),
        )
    }

    /// Transcripts passed to each `complete` call, in call order.
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.borrow().clone()
    }
}

impl ChatModel for ScriptedModel {
    fn complete(&self, _system_prompt: &str, history: &[Turn]) -> Result<String> {
        self.seen.borrow_mut().push(history.to_vec());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Reply(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("scripted model exhausted")),
        }
    }
}

/// One scripted command execution result.
#[derive(Debug, Clone)]
pub enum ScriptedExec {
    /// Succeed with this captured output.
    Output(String),
    /// Fail with this message.
    Fail(String),
}

/// [`VizSession`] double with a fixed snapshot and queued execute results.
///
/// When the execute queue is exhausted, further commands succeed with empty
/// output. Records every executed command and counts lifecycle calls.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    snapshot: SessionSnapshot,
    results: VecDeque<ScriptedExec>,
    executed: Vec<String>,
    snapshot_calls: usize,
    close_calls: usize,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: SessionSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_results(mut self, results: Vec<ScriptedExec>) -> Self {
        self.results = results.into();
        self
    }

    /// Commands passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.clone()
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }
}

impl VizSession for ScriptedSession {
    fn snapshot(&mut self) -> Result<SessionSnapshot> {
        self.snapshot_calls += 1;
        Ok(self.snapshot.clone())
    }

    fn execute(&mut self, command: &str) -> Result<String> {
        if command.trim().is_empty() {
            return Ok(String::new());
        }
        self.executed.push(command.to_string());
        match self.results.pop_front() {
            Some(ScriptedExec::Output(output)) => Ok(output),
            Some(ScriptedExec::Fail(message)) => Err(anyhow!("{message}")),
            None => Ok(String::new()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        Ok(())
    }
}
