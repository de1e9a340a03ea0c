//! In-memory `docker` stand-in for tests.
//!
//! Tracks a single container's status and records every invocation so
//! lifecycle sequences can be asserted without a Docker daemon.

use crate::docker::{DockerCli, DockerOutput};
use crate::error::DockerError;
use async_trait::async_trait;
use devclaw_core::CancellationToken;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeDockerCli {
    status: Mutex<Option<String>>,
    calls: Mutex<Vec<Vec<String>>>,
    failing: HashSet<String>,
    exec: DockerOutput,
}

impl Default for FakeDockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDockerCli {
    /// No container exists yet.
    pub fn new() -> Self {
        Self {
            status: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            exec: DockerOutput {
                status: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    }

    /// Container already exists with the given inspect status.
    pub fn with_state(status: &str) -> Self {
        let fake = Self::new();
        if let Ok(mut s) = fake.status.lock() {
            *s = Some(status.to_string());
        }
        fake
    }

    /// Make the given docker verb exit non-zero.
    pub fn failing(mut self, verb: &str) -> Self {
        self.failing.insert(verb.to_string());
        self
    }

    /// Reply for `docker exec`.
    pub fn exec_reply(mut self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.exec = DockerOutput {
            status: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        self
    }

    /// Every recorded invocation, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// First argument of every recorded invocation.
    pub fn verbs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.into_iter().next())
            .collect()
    }

    fn set_status(&self, status: Option<&str>) {
        if let Ok(mut s) = self.status.lock() {
            *s = status.map(str::to_string);
        }
    }
}

fn ok(stdout: &str) -> DockerOutput {
    DockerOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> DockerOutput {
    DockerOutput {
        status: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl DockerCli for FakeDockerCli {
    async fn run(
        &self,
        args: &[String],
        _timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DockerOutput, DockerError> {
        if cancel.is_cancelled() {
            return Err(DockerError::Cancelled);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }

        let verb = args.first().map(String::as_str).unwrap_or("");
        if self.failing.contains(verb) {
            return Ok(failed(&format!("{verb}: simulated failure")));
        }

        let current = self.status.lock().ok().and_then(|s| s.clone());
        let out = match verb {
            "info" => ok("Server Version: fake"),
            "inspect" => match current {
                Some(status) => ok(&format!("{status}\n")),
                None => failed("Error: No such object"),
            },
            "create" => {
                self.set_status(Some("created"));
                ok("container-id")
            }
            "start" => {
                if current.is_none() {
                    return Ok(failed("Error: No such container"));
                }
                self.set_status(Some("running"));
                ok("")
            }
            "stop" => {
                if current.is_some() {
                    self.set_status(Some("exited"));
                }
                ok("")
            }
            "rm" => {
                self.set_status(None);
                ok("")
            }
            "exec" => {
                if current.as_deref() != Some("running") {
                    return Ok(failed("Error: container is not running"));
                }
                self.exec.clone()
            }
            other => failed(&format!("unknown command: {other}")),
        };
        Ok(out)
    }
}
