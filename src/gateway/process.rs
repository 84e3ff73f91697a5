//! Local-process backend.
//!
//! The generator is spawned directly (never through a shell) and the prompt
//! travels as a single argv entry, so its content cannot inject options or
//! extra commands.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::{GatewayError, GatewayResult};
use super::{non_empty, ModelBackend, OutputFormat};
use crate::config::{BackendSettings, DEFAULT_BACKEND_TIMEOUT_SECS, PROMPT_PLACEHOLDER};

/// Marker that ends option parsing in most CLIs.
const END_OF_OPTIONS: &str = "--";

/// Captured stderr is cut to this many bytes in error messages.
const MAX_STDERR_BYTES: usize = 2048;

/// Runs a local generator and captures its stdout.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    name: String,
    program: String,
    args: Vec<String>,
    json_args: Vec<String>,
    end_of_options: bool,
    timeout: Duration,
}

impl ProcessBackend {
    /// Create a backend that appends the prompt after `--`.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            json_args: Vec::new(),
            end_of_options: true,
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }

    pub fn from_settings(name: &str, settings: &BackendSettings) -> GatewayResult<Self> {
        let BackendSettings::Process {
            program,
            args,
            json_args,
            end_of_options,
            timeout_secs,
        } = settings
        else {
            return Err(GatewayError::config(name, "not a process backend"));
        };

        if program.trim().is_empty() {
            return Err(GatewayError::config(name, "program must not be empty"));
        }

        Ok(Self {
            name: name.to_string(),
            program: program.clone(),
            args: args.clone(),
            json_args: json_args.clone(),
            end_of_options: *end_of_options,
            timeout: Duration::from_secs(*timeout_secs),
        })
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_json_args(mut self, json_args: Vec<String>) -> Self {
        self.json_args = json_args;
        self
    }

    pub fn with_end_of_options(mut self, enabled: bool) -> Self {
        self.end_of_options = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the argv (without the program) for one invocation.
    pub fn command_args(&self, prompt: &str, format: OutputFormat) -> GatewayResult<Vec<String>> {
        if prompt.contains('\0') {
            return Err(GatewayError::config(
                &self.name,
                "prompt contains a NUL byte",
            ));
        }

        let json_args: &[String] = match format {
            OutputFormat::Json => &self.json_args,
            OutputFormat::Text => &[],
        };

        let mut argv = Vec::with_capacity(self.args.len() + json_args.len() + 2);
        let mut placed = false;

        for arg in &self.args {
            if arg == PROMPT_PLACEHOLDER && !placed {
                argv.extend(json_args.iter().cloned());
                argv.push(prompt.to_string());
                placed = true;
            } else {
                argv.push(arg.clone());
            }
        }

        if !placed {
            argv.extend(json_args.iter().cloned());
            if self.end_of_options {
                argv.push(END_OF_OPTIONS.to_string());
            }
            argv.push(prompt.to_string());
        }

        Ok(argv)
    }
}

#[async_trait]
impl ModelBackend for ProcessBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, format: OutputFormat) -> GatewayResult<String> {
        let argv = self.command_args(prompt, format)?;

        debug!(backend = %self.name, program = %self.program, "spawning generator");

        let child = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GatewayError::io(&self.name, e))?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| GatewayError::io(&self.name, e))?,
            Err(_) => {
                warn!(backend = %self.name, "generator timed out, killing it");
                return Err(GatewayError::Timeout {
                    backend: self.name.clone(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate(stderr.trim(), MAX_STDERR_BYTES);
            return Err(GatewayError::transport(
                &self.name,
                format!("generator exited with {}: {}", output.status, stderr),
            ));
        }

        let text = String::from_utf8(output.stdout).map_err(|e| {
            let raw = String::from_utf8_lossy(e.as_bytes()).into_owned();
            GatewayError::envelope(&self.name, "output is not valid UTF-8", raw)
        })?;

        non_empty(&self.name, text)
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
