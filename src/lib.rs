//! Conversational agent that drives a PyMOL session through an LLM.
//!
//! The agent reads operator input line by line, forwards it to a language
//! model together with a snapshot of the live PyMOL session, executes any
//! `<pymol>...</pymol>` command blocks embedded in the reply, and feeds the
//! captured command outputs back into the next turn. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (command extraction, transcript
//!   bookkeeping, report and context rendering). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting collaborators (PyMOL child process, Anthropic
//!   API transport, config files). Isolated behind traits to enable scripted
//!   doubles in tests.
//!
//! [`chat`] coordinates core logic with the injected collaborators to
//! implement the turn loop.

pub mod chat;
pub mod core;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
