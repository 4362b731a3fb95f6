//! Command execution with security controls for resource fetching
//!
//! Provider CLIs (`gcloud`, `ssh`) are the only way fetchers talk to the
//! outside world. Every call goes through a program whitelist, runs with a
//! cleared environment and a restricted `PATH`, and is killed on deadline.

use isc_profile::config::constants;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Executes provider commands with security controls and timeout enforcement
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    default_timeout: Duration,
    allowed_commands: HashSet<String>,
    search_path: String,
    /// Variables copied from the parent environment when set
    passthrough_env: Vec<String>,
    fixed_env: HashMap<String, String>,
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCommandExecutor {
    /// Executor with the default timeout and nothing whitelisted
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(
            constants::runner::DEFAULT_COMMAND_TIMEOUT_SECS,
        ))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: timeout,
            allowed_commands: HashSet::new(),
            search_path: constants::runner::RESTRICTED_PATH.to_string(),
            passthrough_env: Vec::new(),
            fixed_env: HashMap::new(),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn allow_command(&mut self, command: impl Into<String>) {
        self.allowed_commands.insert(command.into());
    }

    pub fn allow_commands(&mut self, commands: &[&str]) {
        self.allowed_commands
            .extend(commands.iter().map(|c| c.to_string()));
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.contains(command)
    }

    /// Append a directory to the restricted search path
    pub fn extend_path(&mut self, dir: &str) {
        if !dir.is_empty() && !self.search_path.split(':').any(|d| d == dir) {
            self.search_path.push(':');
            self.search_path.push_str(dir);
        }
    }

    /// Copy a variable from the parent environment into every child
    pub fn pass_env(&mut self, name: impl Into<String>) {
        self.passthrough_env.push(name.into());
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fixed_env.insert(name.into(), value.into());
    }

    /// Command with the cleared environment and restricted search path applied
    fn prepare(&self, program: &str, args: &[&str]) -> Command {
        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .env("PATH", &self.search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let inherited = self
            .passthrough_env
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name, value)));
        command.envs(inherited).envs(&self.fixed_env);
        command
    }

    /// Run a whitelisted program, capturing output until exit or deadline
    ///
    /// `timeout` overrides the executor default for this call. On deadline
    /// the child is killed and reaped before `Timeout` is returned.
    pub fn execute(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        if !self.is_allowed(program) {
            return Err(CommandError::SecurityViolation {
                reason: format!("'{}' is not in whitelist", program),
            });
        }

        let deadline = timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();
        let mut child = self
            .prepare(program, args)
            .spawn()
            .map_err(|e| spawn_failure(program, e))?;

        // Both pipes are drained while waiting; a full pipe would stall the child
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let waited = wait_timeout::ChildExt::wait_timeout(&mut child, deadline).map_err(|e| {
            CommandError::ExecutionFailed {
                program: program.to_string(),
                reason: e.to_string(),
            }
        })?;

        let Some(status) = waited else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            });
        };

        Ok(CommandOutput {
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
            exit_code: status.code().unwrap_or(-1),
            duration: started.elapsed(),
        })
    }
}

fn spawn_failure(program: &str, error: std::io::Error) -> CommandError {
    let program = program.to_string();
    match error.kind() {
        std::io::ErrorKind::NotFound => CommandError::ProgramNotFound { program },
        std::io::ErrorKind::PermissionDenied => CommandError::PermissionDenied { program },
        _ => CommandError::ExecutionFailed {
            program,
            reason: error.to_string(),
        },
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(reader: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

/// Command execution output
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command execution errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("Execution failed for '{program}': {reason}")]
    ExecutionFailed { program: String, reason: String },

    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Permission denied: {program}")]
    PermissionDenied { program: String },

    #[error("Security violation: {reason}")]
    SecurityViolation { reason: String },
}
