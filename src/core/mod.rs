//! Deterministic, pure logic shared by the agent.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod commands;
pub mod context;
pub mod mode;
pub mod report;
pub mod transcript;
