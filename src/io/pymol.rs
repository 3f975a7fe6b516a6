//! PyMOL session backed by a long-lived child process.
//!
//! The child runs `pymol -cq -p` and reads commands from its stdin. Every
//! submission is framed with a per-call sentinel printed from a python
//! block, so captured output is attributed to exactly one call and a
//! PyMOL-level failure surfaces as an error instead of silent text.
//! Stdout and stderr are drained by reader threads to avoid pipe deadlocks.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::report::{LoadedObject, NamedSelection, SessionSnapshot};
use crate::io::config::AgentConfig;
use crate::io::session::VizSession;

/// A line read from the child, tagged by stream.
#[derive(Debug)]
enum StreamLine {
    Out(String),
    Err(String),
}

/// Live PyMOL child process implementing [`VizSession`].
pub struct PyMolSession {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<StreamLine>,
    /// End sentinels of timed-out calls whose output is still owed by the
    /// child. Later calls discard lines until these have all been seen.
    stale: VecDeque<String>,
    seq: u64,
    command_timeout: Duration,
    shutdown_timeout: Duration,
    output_limit_bytes: usize,
    closed: bool,
}

impl PyMolSession {
    /// Launch the PyMOL child process configured in `config`.
    #[instrument(skip_all, fields(command = %config.pymol_command.join(" ")))]
    pub fn spawn(config: &AgentConfig) -> Result<Self> {
        let argv = &config.pymol_command;
        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", argv[0]))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let (tx, rx) = mpsc::channel();
        let out_tx = tx.clone();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if out_tx.send(StreamLine::Out(line)).is_err() {
                    break;
                }
            }
        });
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(StreamLine::Err(line)).is_err() {
                    break;
                }
            }
        });

        info!("pymol session started");
        Ok(Self {
            child,
            stdin,
            lines: rx,
            stale: VecDeque::new(),
            seq: 0,
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
            closed: false,
        })
    }

    /// Submit a python block and collect stdout lines until this call's
    /// sentinel. Returns the captured lines; fails on an error marker, on
    /// timeout, or when the child hangs up.
    fn submit(&mut self, script: &str, markers: &CallMarkers) -> Result<Vec<String>> {
        self.stdin
            .write_all(script.as_bytes())
            .context("write to pymol stdin")?;
        self.stdin.flush().context("flush pymol stdin")?;

        let deadline = Instant::now() + self.command_timeout;
        let mut captured: Vec<String> = Vec::new();
        let mut captured_bytes = 0usize;
        let mut truncated = 0usize;
        let mut failure: Option<String> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.stale.push_back(markers.done.clone());
                return Err(anyhow!(
                    "pymol command timed out after {:?}",
                    self.command_timeout
                ));
            }
            match self.lines.recv_timeout(remaining) {
                Ok(StreamLine::Out(line)) => {
                    // Output owed by a timed-out call is discarded up to and
                    // including its sentinel; it must never be attributed to
                    // this call.
                    if let Some(pending) = self.stale.front() {
                        if line.starts_with(pending.as_str()) {
                            self.stale.pop_front();
                        }
                        continue;
                    }
                    if line.starts_with(&markers.done) {
                        break;
                    }
                    if let Some(reason) = line.strip_prefix(&markers.error) {
                        failure = Some(reason.trim().to_string());
                        continue;
                    }
                    let len = line.len() + 1;
                    if captured_bytes + len <= self.output_limit_bytes {
                        captured_bytes += len;
                        captured.push(line);
                    } else {
                        truncated += len;
                    }
                }
                Ok(StreamLine::Err(line)) => {
                    // Diagnostics only; stdout is the capture channel.
                    warn!(line = %line, "pymol stderr");
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.stale.push_back(markers.done.clone());
                    return Err(anyhow!(
                        "pymol command timed out after {:?}",
                        self.command_timeout
                    ));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(anyhow!("pymol session ended unexpectedly"));
                }
            }
        }

        if truncated > 0 {
            warn!(truncated, "pymol output truncated");
            captured.push(format!("[output truncated {truncated} bytes]"));
        }
        if let Some(reason) = failure {
            return Err(anyhow!("{reason}"));
        }
        Ok(captured)
    }

    fn next_markers(&mut self) -> CallMarkers {
        self.seq += 1;
        CallMarkers::new(self.seq)
    }
}

impl VizSession for PyMolSession {
    #[instrument(skip_all)]
    fn snapshot(&mut self) -> Result<SessionSnapshot> {
        let markers = self.next_markers();
        let script = snapshot_script(&markers);
        let lines = self.submit(&script, &markers).context("query session state")?;
        Ok(parse_snapshot_lines(&lines))
    }

    #[instrument(skip_all, fields(command_bytes = command.len()))]
    fn execute(&mut self, command: &str) -> Result<String> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(String::new());
        }
        let markers = self.next_markers();
        let script = execute_script(command, &markers)?;
        let lines = self.submit(&script, &markers)?;
        let output = lines.join("\n").trim().to_string();
        debug!(output_bytes = output.len(), "command completed");
        Ok(output)
    }

    #[instrument(skip_all)]
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // A dead child makes this write fail; proceed to reaping either way.
        if self.stdin.write_all(b"quit\n").is_ok() {
            let _ = self.stdin.flush();
        }
        match self
            .child
            .wait_timeout(self.shutdown_timeout)
            .context("wait for pymol exit")?
        {
            Some(status) => {
                info!(exit_code = ?status.code(), "pymol session closed");
            }
            None => {
                warn!(
                    timeout_secs = self.shutdown_timeout.as_secs(),
                    "pymol ignored quit, killing"
                );
                self.child.kill().context("kill pymol")?;
                self.child.wait().context("wait pymol after kill")?;
            }
        }
        Ok(())
    }
}

impl Drop for PyMolSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Per-call output framing markers.
///
/// The sequence number makes each call's markers unique, so a stale line
/// from an earlier call can never terminate or fail a later one.
struct CallMarkers {
    done: String,
    error: String,
}

impl CallMarkers {
    fn new(seq: u64) -> Self {
        Self {
            done: format!("__MOLPILOT_EOC_{seq}__"),
            error: format!("__MOLPILOT_ERR_{seq}__"),
        }
    }
}

/// Python block running one command with status markers.
fn execute_script(command: &str, markers: &CallMarkers) -> Result<String> {
    // The command is embedded in a raw triple-quoted string; a body that
    // contains the closing quotes would escape it.
    if command.contains("'''") {
        return Err(anyhow!("command contains unsupported quoting (''' )"));
    }
    Ok(format!(
        "python\n\
         try:\n\
         \x20   cmd.do(r'''{command}\n\
         ''', echo=0)\n\
         except Exception as _e:\n\
         \x20   print(\"{error} \" + str(_e))\n\
         print(\"{done}\")\n\
         python end\n",
        error = markers.error,
        done = markers.done,
    ))
}

/// Python block printing one parseable line per object and selection.
fn snapshot_script(markers: &CallMarkers) -> String {
    format!(
        "python\n\
         for _obj in cmd.get_object_list():\n\
         \x20   print(\"OBJ\\t%s\\t%d\\t%s\" % (_obj, cmd.count_atoms(_obj), \",\".join(cmd.get_chains(_obj))))\n\
         for _sel in cmd.get_names(\"selections\"):\n\
         \x20   print(\"SEL\\t%s\\t%d\" % (_sel, cmd.count_atoms(_sel)))\n\
         print(\"{done}\")\n\
         python end\n",
        done = markers.done,
    )
}

/// Parse `OBJ`/`SEL` lines into a snapshot, skipping interleaved chatter.
fn parse_snapshot_lines(lines: &[String]) -> SessionSnapshot {
    let mut snapshot = SessionSnapshot::default();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        match fields.as_slice() {
            ["OBJ", name, atoms, chains] => {
                let Ok(atom_count) = atoms.parse() else {
                    continue;
                };
                snapshot.objects.push(LoadedObject {
                    name: (*name).to_string(),
                    atom_count,
                    chains: chains
                        .split(',')
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect(),
                });
            }
            ["SEL", name, atoms] => {
                let Ok(atom_count) = atoms.parse() else {
                    continue;
                };
                snapshot.selections.push(NamedSelection {
                    name: (*name).to_string(),
                    atom_count,
                });
            }
            _ => {}
        }
    }
    snapshot
}
