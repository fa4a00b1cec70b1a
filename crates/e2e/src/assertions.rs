//! Polled assertions over command output
//!
//! Every polled assertion re-runs the whole command on each poll cycle, so
//! the command has to tolerate being repeated. `must_not_run` and the
//! must-not-apply family run exactly once.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::command::{CommandLine, CommandOutput, Runner};
use crate::config::AssertConfig;
use crate::error::{E2eError, E2eResult};
use crate::manifest::TempManifest;
use crate::matcher::{check_contains_all, check_contains_none};
use crate::poll::{retry_until, Diagnostic, PollOutcome};

/// Field of a resource, rendered through `kubectl get -o template`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A field path such as `.status.phase`, wrapped as `{{.status.phase}}`
    Path(String),
    /// A complete Go template, passed through as is
    Template(String),
}

impl Field {
    pub fn path(path: impl Into<String>) -> Self {
        Field::Path(path.into())
    }

    pub fn template(template: impl Into<String>) -> Self {
        Field::Template(template.into())
    }

    fn render(&self) -> String {
        match self {
            Field::Path(path) => format!("{{{{{path}}}}}"),
            Field::Template(template) => template.clone(),
        }
    }
}

/// Names a field of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub kind: String,
    /// Empty for cluster-scoped resources (no `-n` flag)
    pub namespace: String,
    pub name: String,
    pub field: Field,
}

impl FieldRef {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        field: Field,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            field,
        }
    }
}

/// Entry point for assertions in a test.
///
/// ```no_run
/// use kube_e2e::{Asserter, AssertConfig, Field, FieldRef};
///
/// # fn main() -> kube_e2e::E2eResult<()> {
/// let k = Asserter::new(AssertConfig::default());
/// k.must_run(["kubectl create namespace", "demo"])?;
/// k.field_should_contain(
///     &FieldRef::new("namespace", "", "demo", Field::path(".status.phase")),
///     &["Active"],
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Asserter {
    config: AssertConfig,
    runner: Runner,
}

impl Default for Asserter {
    fn default() -> Self {
        Self::new(AssertConfig::default())
    }
}

impl Asserter {
    pub fn new(config: AssertConfig) -> Self {
        let runner = config
            .env
            .iter()
            .fold(Runner::new(), |runner, (k, v)| runner.with_env(k, v));
        Self { config, runner }
    }

    /// Configuration from `KUBE_E2E_*` environment variables
    pub fn from_env() -> E2eResult<Self> {
        Ok(Self::new(AssertConfig::from_env()?))
    }

    pub fn config(&self) -> &AssertConfig {
        &self.config
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// A copy of this asserter with a different polling deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut copy = self.clone();
        copy.config.timeout = timeout;
        copy
    }

    /// The configured kubectl program followed by `args`
    pub fn kubectl(&self, args: &str) -> String {
        format!("{} {}", self.config.kubectl, args)
    }

    fn poll<F>(&self, probe: F) -> PollOutcome
    where
        F: FnMut() -> Result<(), Diagnostic>,
    {
        retry_until(self.config.poll_policy(), probe)
    }

    /// How a non-zero exit shows up in a probe.
    fn exec_diagnostic(&self, err: &E2eError) -> Diagnostic {
        let message = format!("failed: {err}");
        if err.is_retryable() && self.config.retry_exec_errors {
            Diagnostic::command_failed(message)
        } else {
            Diagnostic::fatal(message)
        }
    }

    /// Poll `check` over a fresh run of `cmd` each cycle.
    ///
    /// A command that cannot be started ends polling on the first attempt and
    /// its launch error is returned unchanged.
    fn poll_output<F>(&self, cmd: &CommandLine, mut check: F) -> E2eResult<()>
    where
        F: FnMut(CommandOutput) -> Result<(), Diagnostic>,
    {
        let mut launch_error = None;
        let outcome = self.poll(|| match self.runner.run(cmd) {
            Ok(output) => check(output),
            Err(e) => {
                let diagnostic = Diagnostic::fatal(format!("failed: {e}"));
                launch_error = Some(e);
                Err(diagnostic)
            }
        });
        match launch_error {
            Some(e) => Err(e),
            None => outcome.into_result(cmd),
        }
    }

    /// Poll until the command exits successfully.
    pub fn must_run(&self, cmdln: impl Into<CommandLine>) -> E2eResult<()> {
        let cmd = cmdln.into();
        self.poll_output(&cmd, |output| match output.into_result() {
            Ok(text) => {
                debug!("Output (passed): {}", text);
                Ok(())
            }
            Err(e) => {
                debug!("Output (failed): {}", e);
                Err(self.exec_diagnostic(&e))
            }
        })
    }

    /// Run once and require a non-zero exit.
    ///
    /// A command that cannot be started at all is an error, not a pass.
    pub fn must_not_run(&self, cmdln: impl Into<CommandLine>) -> E2eResult<()> {
        let cmd = cmdln.into();
        match self.runner.try_run(&cmd) {
            Ok(output) => Err(E2eError::UnexpectedSuccess {
                command: cmd.to_string(),
                output,
            }),
            Err(E2eError::CommandFailed { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Poll until the command succeeds and its output contains every substring.
    pub fn run_should_contain<S: AsRef<str>>(
        &self,
        substrs: &[S],
        cmdln: impl Into<CommandLine>,
    ) -> E2eResult<()> {
        let cmd = cmdln.into();
        self.poll_output(&cmd, |output| {
            debug!("Output: {}", output.text);
            let missing = check_contains_all(substrs, &output.text);
            output.into_result().map_err(|e| self.exec_diagnostic(&e))?;
            missing.map_err(Diagnostic::mismatch)
        })
    }

    /// Poll until the command succeeds and its output contains none of the substrings.
    pub fn run_should_not_contain<S: AsRef<str>>(
        &self,
        substrs: &[S],
        cmdln: impl Into<CommandLine>,
    ) -> E2eResult<()> {
        let cmd = cmdln.into();
        self.poll_output(&cmd, |output| {
            let text = output.into_result().map_err(|e| self.exec_diagnostic(&e))?;
            check_contains_none(substrs, &text).map_err(Diagnostic::mismatch)
        })
    }

    /// Poll until the command fails and its output contains every substring.
    pub fn run_error_should_contain<S: AsRef<str>>(
        &self,
        substrs: &[S],
        cmdln: impl Into<CommandLine>,
    ) -> E2eResult<()> {
        let cmd = cmdln.into();
        self.poll_output(&cmd, |output| {
            debug!("Output: {}", output.text);
            if output.success() {
                return Err(Diagnostic::mismatch("passed but should have failed"));
            }
            check_contains_all(substrs, &output.text).map_err(Diagnostic::mismatch)
        })
    }

    /// `kubectl get <kind> <name> [-n <namespace>] -o template --template=<field>`
    pub fn field_command(&self, field: &FieldRef) -> CommandLine {
        let mut cmd = CommandLine::new([
            self.kubectl("get"),
            field.kind.clone(),
            field.name.clone(),
        ]);
        if !field.namespace.is_empty() {
            cmd.push("-n");
            cmd.push(field.namespace.clone());
        }
        cmd.push(format!("-o template --template={}", field.field.render()));
        cmd
    }

    pub fn field_should_contain<S: AsRef<str>>(
        &self,
        field: &FieldRef,
        substrs: &[S],
    ) -> E2eResult<()> {
        self.run_should_contain(substrs, self.field_command(field))
    }

    pub fn field_should_not_contain<S: AsRef<str>>(
        &self,
        field: &FieldRef,
        substrs: &[S],
    ) -> E2eResult<()> {
        self.run_should_not_contain(substrs, self.field_command(field))
    }

    fn apply_command(&self, manifest: &TempManifest, user: Option<&str>) -> CommandLine {
        // Quoted so a temp dir containing spaces stays one argument
        let mut cmd = CommandLine::new([
            self.kubectl("apply -f"),
            format!("\"{}\"", manifest.path().display()),
        ]);
        if let Some(user) = user {
            cmd.push("--as");
            cmd.push(user);
        }
        cmd
    }

    fn apply_yaml(&self, yaml: &str, user: Option<&str>, expect: Expect) -> E2eResult<()> {
        self.apply_manifest(TempManifest::write(yaml)?, user, expect)
    }

    fn apply_manifest(
        &self,
        manifest: TempManifest,
        user: Option<&str>,
        expect: Expect,
    ) -> E2eResult<()> {
        let cmd = self.apply_command(&manifest, user);
        let result = match expect {
            Expect::Success => self.must_run(cmd),
            Expect::Failure => self.must_not_run(cmd),
        };
        let closed = manifest.close();
        result?;
        closed
    }

    pub fn must_apply_yaml(&self, yaml: &str) -> E2eResult<()> {
        self.apply_yaml(yaml, None, Expect::Success)
    }

    pub fn must_not_apply_yaml(&self, yaml: &str) -> E2eResult<()> {
        self.apply_yaml(yaml, None, Expect::Failure)
    }

    /// Apply while impersonating `user` (`kubectl --as`).
    pub fn must_apply_yaml_as_user(&self, yaml: &str, user: &str) -> E2eResult<()> {
        self.apply_yaml(yaml, Some(user), Expect::Success)
    }

    pub fn must_not_apply_yaml_as_user(&self, yaml: &str, user: &str) -> E2eResult<()> {
        self.apply_yaml(yaml, Some(user), Expect::Failure)
    }

    /// Serialize `value` to YAML and apply it.
    pub fn must_apply<T: Serialize>(&self, value: &T) -> E2eResult<()> {
        self.apply_manifest(TempManifest::from_value(value)?, None, Expect::Success)
    }
}

#[derive(Debug, Clone, Copy)]
enum Expect {
    Success,
    Failure,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{} {}", self.kind, self.name, self.field.render())
        } else {
            write!(
                f,
                "{}/{}/{} {}",
                self.namespace,
                self.kind,
                self.name,
                self.field.render()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asserter() -> Asserter {
        Asserter::new(AssertConfig {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        })
    }

    #[test]
    fn field_command_with_namespace() {
        let field = FieldRef::new("pod", "kube-system", "coredns", Field::path(".status.phase"));
        let cmd = asserter().field_command(&field);
        assert_eq!(
            cmd.args(),
            [
                "kubectl",
                "get",
                "pod",
                "coredns",
                "-n",
                "kube-system",
                "-o",
                "template",
                "--template={{.status.phase}}"
            ]
        );
    }

    #[test]
    fn field_command_without_namespace_omits_flag() {
        let field = FieldRef::new("node", "", "worker-1", Field::template("{{.metadata.name}}"));
        let cmd = asserter().field_command(&field);
        assert!(!cmd.args().iter().any(|a| a == "-n"));
        assert_eq!(
            cmd.args().last().map(String::as_str),
            Some("--template={{.metadata.name}}")
        );
    }

    #[test]
    fn with_timeout_leaves_original_untouched() {
        let base = asserter();
        let longer = base.with_timeout(Duration::from_secs(90));
        assert_eq!(longer.config().timeout, Duration::from_secs(90));
        assert_eq!(base.config().timeout, Duration::from_millis(200));
    }

    #[test]
    fn config_env_reaches_children() {
        let mut config = AssertConfig::default();
        config.env.insert("E2E_MARKER".into(), "present".into());
        let k = Asserter::new(config).with_timeout(Duration::from_millis(100));
        k.run_should_contain(&["marker=present"], ["sh -c", "\"echo marker=$E2E_MARKER\""])
            .unwrap();
    }

    #[test]
    fn spawn_failure_is_not_retried() {
        let k = asserter().with_timeout(Duration::from_secs(30));
        let start = std::time::Instant::now();
        let err = k.must_run(["kube-e2e-no-such-program"]).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(matches!(err, E2eError::Spawn { .. }));
    }

    #[test]
    fn launch_errors_surface_from_every_polled_check() {
        let k = asserter().with_timeout(Duration::from_secs(30));
        let cmd = ["kube-e2e-no-such-program"];
        for err in [
            k.run_should_contain(&["x"], cmd).unwrap_err(),
            k.run_should_not_contain(&["x"], cmd).unwrap_err(),
            k.run_error_should_contain(&["x"], cmd).unwrap_err(),
            k.must_not_run(cmd).unwrap_err(),
        ] {
            assert!(matches!(err, E2eError::Spawn { .. }), "{err:?}");
        }
    }

    #[test]
    fn exec_errors_can_be_made_fatal() {
        let k = Asserter::new(AssertConfig {
            timeout: Duration::from_secs(30),
            retry_exec_errors: false,
            ..Default::default()
        });
        let start = std::time::Instant::now();
        assert!(k.run_should_contain(&["x"], ["false"]).is_err());
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn field_ref_display() {
        let field = FieldRef::new("pod", "default", "web", Field::path(".status.phase"));
        assert_eq!(field.to_string(), "default/pod/web {{.status.phase}}");
    }
}
