//! Per-turn context assembly and command result descriptors.
//!
//! Everything the model needs beyond the operator's words is appended to the
//! outgoing user turn: a fresh session report, the current mode label, and
//! the outputs of commands executed last turn. Command results use an
//! explicit three-way type instead of overloading errors or sentinel values.

use crate::core::mode::Mode;

/// Outcome of executing one extracted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The command ran and printed something.
    Completed(String),
    /// The command ran and printed nothing.
    Empty,
    /// The command failed; the reason is shown to the model next turn.
    Failed(String),
}

/// Record of one command execution within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExecution {
    pub command: String,
    pub result: CommandResult,
}

impl CommandExecution {
    /// Render this execution as a pending-output descriptor for the next
    /// turn's context. `Empty` results produce no descriptor: the model
    /// learns about every failure and every output, but silence is silence.
    pub fn descriptor(&self) -> Option<String> {
        match &self.result {
            CommandResult::Completed(output) => {
                Some(format!("  '{}' -> {}", self.command, output))
            }
            CommandResult::Empty => None,
            CommandResult::Failed(reason) => {
                Some(format!("  Command '{}' failed: {}", self.command, reason))
            }
        }
    }
}

/// Compose the content of the outgoing user turn.
///
/// `pending` holds descriptors from the previous turn's command executions;
/// the caller clears it after this returns (descriptors span exactly one
/// turn).
pub fn build_user_context(
    user_text: &str,
    state_report: &str,
    mode: Mode,
    pending: &[String],
) -> String {
    let mut content = format!(
        "{user_text}\n\nCurrent PyMOL session state:\n{state_report}\nCurrent mode: {mode}"
    );
    if !pending.is_empty() {
        content.push_str("\nOutputs from commands executed last turn:\n");
        content.push_str(&pending.join("\n"));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_descriptor_names_command_and_output() {
        let exec = CommandExecution {
            command: "fetch 1ubq".to_string(),
            result: CommandResult::Completed("loaded 1ubq".to_string()),
        };
        assert_eq!(
            exec.descriptor(),
            Some("  'fetch 1ubq' -> loaded 1ubq".to_string())
        );
    }

    #[test]
    fn empty_result_has_no_descriptor() {
        let exec = CommandExecution {
            command: "zoom".to_string(),
            result: CommandResult::Empty,
        };
        assert_eq!(exec.descriptor(), None);
    }

    #[test]
    fn failed_descriptor_names_command_and_reason() {
        let exec = CommandExecution {
            command: "align a, b".to_string(),
            result: CommandResult::Failed("no matching atoms".to_string()),
        };
        assert_eq!(
            exec.descriptor(),
            Some("  Command 'align a, b' failed: no matching atoms".to_string())
        );
    }

    #[test]
    fn context_without_pending_omits_outputs_section() {
        let content = build_user_context("color it blue", "No objects loaded.", Mode::Guided, &[]);
        assert!(content.starts_with("color it blue\n\n"));
        assert!(content.contains("Current PyMOL session state:\nNo objects loaded."));
        assert!(content.contains("Current mode: guided"));
        assert!(!content.contains("Outputs from commands executed last turn:"));
    }

    #[test]
    fn context_with_pending_appends_descriptors_in_order() {
        let pending = vec!["  'a' -> one".to_string(), "  'b' -> two".to_string()];
        let content =
            build_user_context("next", "No objects loaded.", Mode::Expert, &pending);
        assert!(content.contains(
            "Outputs from commands executed last turn:\n  'a' -> one\n  'b' -> two"
        ));
        assert!(content.contains("Current mode: expert"));
    }
}
