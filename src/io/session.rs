//! Session abstraction for the visualization engine.
//!
//! The [`VizSession`] trait decouples the turn loop from the actual engine
//! (currently a PyMOL child process). Tests use scripted sessions that
//! return predetermined snapshots and outputs without spawning processes.

use anyhow::Result;

use crate::core::report::SessionSnapshot;

/// Abstraction over the single stateful visualization session.
///
/// Exactly one live session backs a conversation. It is injected into the
/// loop at construction and torn down through [`VizSession::close`] exactly
/// once at shutdown; it is not safe for concurrent use.
pub trait VizSession {
    /// Enumerate the session's current objects and selections.
    ///
    /// Called fresh every turn; the session mutates between turns, so the
    /// result must never be cached.
    fn snapshot(&mut self) -> Result<SessionSnapshot>;

    /// Run one command and return its captured text output, trimmed.
    ///
    /// Empty or whitespace-only commands are a no-op returning `""`.
    /// Output captured during one call must never leak into another.
    /// Failures propagate to the caller; this method does not swallow them.
    fn execute(&mut self, command: &str) -> Result<String>;

    /// Shut the session down. Must be idempotent.
    fn close(&mut self) -> Result<()>;
}
