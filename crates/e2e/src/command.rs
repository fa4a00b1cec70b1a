//! Command runner - tokenizing command lines and capturing combined output

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Works around https://github.com/kubernetes/kubectl/issues/1098, where
/// kubectl sends request headers that older API servers reject.
pub const COMMAND_HEADERS_ENV: (&str, &str) = ("KUBECTL_COMMAND_HEADERS", "false");

/// An ordered list of command-line fragments.
///
/// Each fragment may hold several arguments (e.g. `"kubectl get"`), which are
/// split on single spaces. A fragment that starts and ends with a double quote
/// (and is longer than the two quotes) is passed to the OS as one argument
/// with the quotes stripped, so `["echo", "\"hello world\""]` runs `echo` with
/// one argument instead of two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    fragments: Vec<String>,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        let args = tokenize(&fragments);
        Self { fragments, args }
    }

    /// Fragments as given by the caller
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Resolved OS arguments, program first
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Append more fragments, re-tokenizing only the new ones
    pub fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        self.args.extend(tokenize_fragment(&fragment));
        self.fragments.push(fragment);
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fragments.join(" "))
    }
}

impl From<&[&str]> for CommandLine {
    fn from(fragments: &[&str]) -> Self {
        Self::new(fragments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(fragments: [&str; N]) -> Self {
        Self::new(fragments)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(fragments: Vec<String>) -> Self {
        Self::new(fragments)
    }
}

/// Resolve fragments into OS arguments.
pub fn tokenize<S: AsRef<str>>(fragments: &[S]) -> Vec<String> {
    fragments
        .iter()
        .flat_map(|f| tokenize_fragment(f.as_ref()))
        .collect()
}

fn tokenize_fragment(fragment: &str) -> Vec<String> {
    if fragment.len() > 2 && fragment.starts_with('"') && fragment.ends_with('"') {
        vec![fragment[1..fragment.len() - 1].to_string()]
    } else {
        fragment.split(' ').map(str::to_string).collect()
    }
}

/// Combined stdout/stderr of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub text: String,
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turn a non-zero exit into [`E2eError::CommandFailed`], keeping the output.
    pub fn into_result(self) -> E2eResult<String> {
        if self.status.success() {
            Ok(self.text)
        } else {
            Err(E2eError::CommandFailed {
                status: self.status,
                output: self.text,
            })
        }
    }
}

/// Runs command lines as child processes.
///
/// Children inherit the parent environment plus [`COMMAND_HEADERS_ENV`] and
/// any overrides added with [`Runner::with_env`].
#[derive(Debug, Clone)]
pub struct Runner {
    env: BTreeMap<String, String>,
}

impl Default for Runner {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        env.insert(
            COMMAND_HEADERS_ENV.0.to_string(),
            COMMAND_HEADERS_ENV.1.to_string(),
        );
        Self { env }
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Run a command and capture its combined output.
    ///
    /// Only failing to launch the process is an error here; a non-zero exit
    /// is reported through [`CommandOutput::success`].
    pub fn run(&self, cmdln: &CommandLine) -> E2eResult<CommandOutput> {
        let args = cmdln.args();
        let (program, rest) = args.split_first().ok_or(E2eError::EmptyCommand)?;

        info!("[{}] Running: {:?}", chrono::Utc::now().timestamp(), args);

        let spawn_err = |source| E2eError::Spawn {
            program: program.clone(),
            source,
        };

        // One pipe for both streams keeps stdout and stderr interleaved in
        // the order the child wrote them.
        let (mut reader, writer) = std::io::pipe().map_err(spawn_err)?;
        let mut cmd = Command::new(program);
        cmd.args(rest)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_err)?)
            .stderr(writer);

        let mut child = cmd.spawn().map_err(spawn_err)?;
        // The Command still owns write ends of the pipe; reading would never
        // see EOF while it is alive.
        drop(cmd);

        let mut buf = Vec::new();
        let read = reader.read_to_end(&mut buf);
        // Closing our end lets a child still writing see EPIPE and exit.
        drop(reader);
        let status = child.wait()?;
        read?;

        debug!(%status, bytes = buf.len(), "Command finished: {:?}", args);

        Ok(CommandOutput {
            text: String::from_utf8_lossy(&buf).into_owned(),
            status,
        })
    }

    /// Run a command, failing on non-zero exit, and log its output.
    pub fn try_run(&self, cmdln: &CommandLine) -> E2eResult<String> {
        let result = self.run(cmdln).and_then(CommandOutput::into_result);
        match &result {
            Ok(output) => debug!("Output (passed): {}", output),
            Err(e) => debug!("Output (failed): {}", e),
        }
        result
    }

    /// Like [`Runner::try_run`] without logging the output.
    pub fn try_run_quietly(&self, cmdln: &CommandLine) -> E2eResult<String> {
        self.run(cmdln).and_then(CommandOutput::into_result)
    }
}
