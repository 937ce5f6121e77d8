//! Subprocess-backed integration oracle.
//!
//! Runs a configured external command per evaluation, writing the JSON
//! [`OracleRequest`](super::OracleRequest) to its stdin and reading a JSON
//! response `{"phi": <f64>, "partition": <any>}` from its stdout. The
//! child is killed when it overruns the configured timeout.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sp_common::config::OracleSettings;
use sp_common::{Error, Result};
use tracing::{debug, warn};

use super::{IntegrationOracle, Network, OracleRequest, StateIntegration};

/// Polling interval while waiting for the child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cap on captured stderr retained for error messages.
const MAX_STDERR_BYTES: usize = 4096;

/// Integration oracle that shells out to an external command.
#[derive(Debug, Clone)]
pub struct SubprocessOracle {
    settings: OracleSettings,
}

impl SubprocessOracle {
    pub fn new(settings: OracleSettings) -> Self {
        SubprocessOracle { settings }
    }

    /// Whether the configured command can be found at all.
    pub fn available(&self) -> bool {
        command_on_path(&self.settings.command)
    }

    fn run(&self, request_json: Vec<u8>) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::OracleUnavailable(format!(
                        "command not found: {}",
                        self.settings.command
                    ))
                } else {
                    Error::Oracle(format!(
                        "failed to spawn {}: {}",
                        self.settings.command, e
                    ))
                }
            })?;

        // Feed stdin from a thread: a child that fills its stdout pipe
        // before draining stdin would otherwise deadlock us.
        let mut stdin = child.stdin.take().expect("stdin was piped");
        let writer = std::thread::spawn(move || {
            let _ = stdin.write_all(&request_json);
            // Drop closes the pipe so the child sees EOF.
        });

        let mut stdout = child.stdout.take().expect("stdout was piped");
        let stdout_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        });
        let mut stderr = child.stderr.take().expect("stderr was piped");
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        let deadline = Instant::now() + Duration::from_secs(self.settings.timeout_secs);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(
                            command = %self.settings.command,
                            timeout_secs = self.settings.timeout_secs,
                            "oracle timed out; killing"
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        // Reader threads are detached rather than joined:
                        // a grandchild holding the pipes open must not
                        // stall the error path.
                        drop(writer);
                        drop(stdout_reader);
                        drop(stderr_reader);
                        return Err(Error::Oracle(format!(
                            "{} timed out after {}s",
                            self.settings.command, self.settings.timeout_secs
                        )));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(Error::Oracle(format!("wait failed: {e}")));
                }
            }
        };

        let _ = writer.join();
        let stdout_buf = stdout_reader.join().unwrap_or_default();
        let stderr_buf = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let kept = stderr_buf.len().min(MAX_STDERR_BYTES);
            let stderr_text = String::from_utf8_lossy(&stderr_buf[..kept]);
            return Err(Error::Oracle(format!(
                "{} exited with {}: {}",
                self.settings.command,
                status,
                stderr_text.trim()
            )));
        }
        Ok(stdout_buf)
    }
}

impl IntegrationOracle for SubprocessOracle {
    fn evaluate(&self, network: &Network, state: &[usize]) -> Result<StateIntegration> {
        let request = OracleRequest::new(
            network,
            state,
            &self.settings.partition_mode,
            self.settings.assume_cuts_cannot_create_concepts,
        )?;
        let request_json = serde_json::to_vec(&request)?;

        let started = Instant::now();
        let stdout = self.run(request_json)?;
        let response: StateIntegration = serde_json::from_slice(&stdout).map_err(|e| {
            Error::Oracle(format!(
                "{} produced invalid JSON: {}",
                self.settings.command, e
            ))
        })?;

        if !response.phi.is_finite() || response.phi < 0.0 {
            return Err(Error::Oracle(format!(
                "{} returned invalid phi {}",
                self.settings.command, response.phi
            )));
        }

        debug!(
            state = ?state,
            phi = response.phi,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "oracle evaluation complete"
        );
        Ok(response)
    }
}

/// Resolve a command name the way the shell would: explicit paths are
/// checked directly, bare names are searched on PATH.
fn command_on_path(command: &str) -> bool {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(command).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_on_path_finds_sh() {
        assert!(command_on_path("sh"));
        assert!(!command_on_path("definitely-not-a-real-command-sp"));
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        let oracle = SubprocessOracle::new(OracleSettings {
            command: "definitely-not-a-real-command-sp".to_string(),
            args: vec![],
            timeout_secs: 5,
            partition_mode: "all".to_string(),
            assume_cuts_cannot_create_concepts: true,
        });
        assert!(!oracle.available());
    }
}
