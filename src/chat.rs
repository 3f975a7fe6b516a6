//! Turn orchestration: the conversation loop between operator, model, and
//! session.
//!
//! One turn reads a line of operator input, builds the outgoing user context
//! (fresh session report, mode label, last turn's command outputs), calls the
//! model, commits the reply, and executes every embedded command in order.
//! Failures are contained per the taxonomy: a failed model call rolls the
//! attempted user turn back and the loop continues; a failed command becomes
//! a descriptor for the model to see next turn and never aborts its
//! siblings, the turn, or the conversation.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::commands::extract_commands;
use crate::core::context::{CommandExecution, CommandResult, build_user_context};
use crate::core::mode::{InputKind, Mode, classify_input};
use crate::core::report::render_report;
use crate::core::transcript::Transcript;
use crate::io::model::ChatModel;
use crate::io::session::VizSession;

/// What one line of operator input produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Operator asked to end the session.
    Quit,
    /// Blank input; nothing happened.
    Noop,
    /// Mode keyword; mode updated, transcript untouched.
    ModeSwitched(Mode),
    /// The model call failed; the attempted turn was rolled back.
    ModelFailed(String),
    /// A committed assistant reply and its command executions.
    Reply {
        text: String,
        executions: Vec<CommandExecution>,
    },
}

/// The conversation loop over injected model and session collaborators.
pub struct ChatLoop<M: ChatModel, S: VizSession> {
    model: M,
    session: S,
    system_prompt: String,
    transcript: Transcript,
    mode: Mode,
    /// Descriptors from this turn's command executions, consumed and cleared
    /// when the next turn's context is built.
    pending: Vec<String>,
    closed: bool,
}

impl<M: ChatModel, S: VizSession> ChatLoop<M, S> {
    pub fn new(model: M, session: S, system_prompt: String, mode: Mode) -> Self {
        Self {
            model,
            session,
            system_prompt,
            transcript: Transcript::new(),
            mode,
            pending: Vec::new(),
            closed: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Direct access to the session, for startup work such as presets.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Process one line of operator input.
    ///
    /// Returns `Err` only for faults the loop cannot recover from (a broken
    /// session); model and command failures are reported in the outcome.
    #[instrument(skip_all)]
    pub fn handle_line(&mut self, line: &str) -> Result<TurnOutcome> {
        let text = match classify_input(line) {
            InputKind::Empty => return Ok(TurnOutcome::Noop),
            InputKind::Quit => return Ok(TurnOutcome::Quit),
            InputKind::SwitchMode(mode) => {
                info!(mode = %mode, "mode switched");
                self.mode = mode;
                return Ok(TurnOutcome::ModeSwitched(mode));
            }
            InputKind::Message(text) => text,
        };

        // The report is regenerated every turn; the session mutates between
        // turns and a cached copy would mislead the model.
        let snapshot = self.session.snapshot().context("query session state")?;
        let report = render_report(&snapshot);
        let content = build_user_context(&text, &report, self.mode, &self.pending);
        self.pending.clear();
        self.transcript.push_user(content);

        let reply = match self.model.complete(&self.system_prompt, self.transcript.turns()) {
            Ok(reply) => reply,
            Err(err) => {
                // Full rollback: the failed attempt must leave no trace.
                self.transcript.rollback_last_user();
                warn!(err = %err, "model call failed, turn rolled back");
                return Ok(TurnOutcome::ModelFailed(format!("{err:#}")));
            }
        };

        // The reply is committed unconditionally; command failures below
        // affect only the pending outputs, never the transcript.
        self.transcript.push_assistant(reply.clone());

        let executions = self.run_commands(&reply);
        Ok(TurnOutcome::Reply {
            text: reply,
            executions,
        })
    }

    fn run_commands(&mut self, reply: &str) -> Vec<CommandExecution> {
        let commands = extract_commands(reply);
        debug!(count = commands.len(), "executing extracted commands");

        let mut executions = Vec::with_capacity(commands.len());
        for command in commands {
            let result = match self.session.execute(&command) {
                Ok(output) if output.is_empty() => CommandResult::Empty,
                Ok(output) => CommandResult::Completed(output),
                Err(err) => {
                    warn!(command = %command, err = %err, "command failed");
                    CommandResult::Failed(format!("{err:#}"))
                }
            };
            let execution = CommandExecution { command, result };
            if let Some(descriptor) = execution.descriptor() {
                self.pending.push(descriptor);
            }
            executions.push(execution);
        }
        executions
    }

    /// Tear the session down. Idempotent; teardown failure is fatal since
    /// nothing follows it.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.close().context("close session")
    }

    /// Drive the loop over a line-oriented prompt until quit or EOF.
    ///
    /// The session is closed on every exit path, including errors.
    pub fn run_repl(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        let result = self.repl_inner(input, output);
        let closed = self.close();
        result.and(closed)
    }

    fn repl_inner(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        writeln!(output, "PyMOL agent ready (mode: {}).", self.mode)?;
        writeln!(
            output,
            "Type 'guided' or 'expert' to switch modes, 'quit' to exit.\n"
        )?;

        loop {
            write!(output, "You: ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line).context("read input")? == 0 {
                writeln!(output, "\nExiting.")?;
                return Ok(());
            }

            match self.handle_line(&line)? {
                TurnOutcome::Noop => {}
                TurnOutcome::Quit => {
                    writeln!(output, "Goodbye.")?;
                    return Ok(());
                }
                TurnOutcome::ModeSwitched(mode) => {
                    writeln!(output, "Switched to {mode} mode.\n")?;
                }
                TurnOutcome::ModelFailed(message) => {
                    writeln!(output, "[ERROR] model call failed: {message}\n")?;
                }
                TurnOutcome::Reply { text, executions } => {
                    writeln!(output, "\nAgent: {text}\n")?;
                    for execution in &executions {
                        writeln!(output, "[CMD] {}", execution.command)?;
                        match &execution.result {
                            CommandResult::Completed(out) => {
                                writeln!(output, "      -> {out}")?;
                            }
                            CommandResult::Empty => {}
                            CommandResult::Failed(reason) => {
                                writeln!(output, "      ! ERROR: {reason}")?;
                            }
                        }
                    }
                    if !executions.is_empty() {
                        writeln!(output)?;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::Role;
    use crate::test_support::{ScriptedExec, ScriptedModel, ScriptedReply, ScriptedSession};

    fn chat(model: ScriptedModel, session: ScriptedSession) -> ChatLoop<ScriptedModel, ScriptedSession> {
        ChatLoop::new(model, session, "system".to_string(), Mode::Guided)
    }

    #[test]
    fn reply_is_committed_and_commands_run_in_order() {
        let model = ScriptedModel::replying(&[
            "sure <pymol>fetch 1ubq</pymol> then <pymol>show cartoon</pymol>",
        ]);
        let mut chat = chat(model, ScriptedSession::new());

        let outcome = chat.handle_line("load ubiquitin").expect("turn");
        let TurnOutcome::Reply { executions, .. } = outcome else {
            panic!("expected reply, got {outcome:?}");
        };
        assert_eq!(executions.len(), 2);
        assert_eq!(
            chat.session_mut().executed(),
            vec!["fetch 1ubq", "show cartoon"]
        );
        assert_eq!(chat.transcript().len(), 2);
        assert_eq!(chat.transcript().turns()[1].role, Role::Assistant);
    }

    #[test]
    fn model_failure_rolls_back_the_user_turn() {
        let model = ScriptedModel::new(vec![
            ScriptedReply::Reply("ok".to_string()),
            ScriptedReply::Fail("api overloaded".to_string()),
        ]);
        let mut chat = chat(model, ScriptedSession::new());

        chat.handle_line("first").expect("turn");
        let len_before = chat.transcript().len();

        let outcome = chat.handle_line("second").expect("turn");
        assert!(matches!(outcome, TurnOutcome::ModelFailed(ref m) if m.contains("api overloaded")));
        assert_eq!(chat.transcript().len(), len_before);
    }

    #[test]
    fn failed_command_does_not_abort_siblings() {
        let model = ScriptedModel::replying(&[
            "<pymol>a</pymol><pymol>b</pymol><pymol>c</pymol>",
            "noted",
        ]);
        let session = ScriptedSession::new().with_results(vec![
            ScriptedExec::Output("one".to_string()),
            ScriptedExec::Fail("no such object".to_string()),
            ScriptedExec::Output("three".to_string()),
        ]);
        let mut chat = chat(model, session);

        let outcome = chat.handle_line("run them").expect("turn");
        let TurnOutcome::Reply { executions, .. } = outcome else {
            panic!("expected reply");
        };
        assert_eq!(executions.len(), 3);
        assert!(matches!(executions[1].result, CommandResult::Failed(_)));
        assert_eq!(chat.session_mut().executed(), vec!["a", "b", "c"]);

        // All three descriptors reach the next turn's context.
        chat.handle_line("continue").expect("turn");
        let seen = chat.model_seen_last();
        assert!(seen.contains("'a' -> one"));
        assert!(seen.contains("Command 'b' failed: no such object"));
        assert!(seen.contains("'c' -> three"));
        // The reply itself stayed committed despite the failure.
        assert_eq!(chat.transcript().len(), 4);
    }

    #[test]
    fn pending_outputs_span_exactly_one_turn() {
        let model = ScriptedModel::replying(&["<pymol>count_atoms</pymol>", "ok", "ok again"]);
        let session = ScriptedSession::new()
            .with_results(vec![ScriptedExec::Output("count: 660".to_string())]);
        let mut chat = chat(model, session);

        chat.handle_line("count the atoms").expect("turn one");
        chat.handle_line("thanks").expect("turn two");
        assert!(chat.model_seen_last().contains("count: 660"));

        chat.handle_line("anything else").expect("turn three");
        assert!(!chat.model_seen_last().contains("count: 660"));
    }

    #[test]
    fn empty_command_output_produces_no_descriptor() {
        let model = ScriptedModel::replying(&["<pymol>zoom</pymol>", "ok"]);
        let mut chat = chat(model, ScriptedSession::new());

        chat.handle_line("zoom in").expect("turn");
        chat.handle_line("next").expect("turn");
        assert!(
            !chat
                .model_seen_last()
                .contains("Outputs from commands executed last turn")
        );
    }

    #[test]
    fn mode_switch_touches_nothing_but_mode() {
        let model = ScriptedModel::replying(&["ok"]);
        let mut chat = chat(model, ScriptedSession::new());

        let outcome = chat.handle_line("expert").expect("switch");
        assert_eq!(outcome, TurnOutcome::ModeSwitched(Mode::Expert));
        assert_eq!(chat.mode(), Mode::Expert);
        assert!(chat.transcript().is_empty());

        chat.handle_line("hello").expect("turn");
        assert!(chat.model_seen_last().contains("Current mode: expert"));
    }

    #[test]
    fn blank_input_is_a_noop() {
        let model = ScriptedModel::replying(&[]);
        let mut chat = chat(model, ScriptedSession::new());
        assert_eq!(chat.handle_line("   ").expect("noop"), TurnOutcome::Noop);
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let model = ScriptedModel::replying(&[]);
        let mut chat = chat(model, ScriptedSession::new());
        chat.close().expect("close");
        chat.close().expect("second close");
        assert_eq!(chat.session_mut().close_calls(), 1);
    }

    impl ChatLoop<ScriptedModel, ScriptedSession> {
        /// Content of the latest user turn the scripted model was shown.
        fn model_seen_last(&self) -> String {
            let calls = self.model.seen();
            let turns = calls.last().expect("model was called");
            turns
                .iter()
                .rev()
                .find(|turn| turn.role == Role::User)
                .expect("user turn present")
                .content
                .clone()
        }
    }
}
