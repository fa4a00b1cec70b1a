//! CLI Commands

pub mod apply;
pub mod check;
pub mod name;

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use kube_e2e::{E2eError, E2eResult};

use crate::output::{print_error, print_item, print_success, OutputFormat, TableDisplay};

/// Outcome of one assertion, as printed by every check command
#[derive(Debug, Serialize, Clone)]
pub struct Report {
    pub check: &'static str,
    pub target: String,
    pub passed: bool,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TableDisplay for Report {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "Target", "Result", "Elapsed", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.check.to_string(),
            self.target.clone(),
            if self.passed { "pass" } else { "fail" }.to_string(),
            format!("{} ms", self.elapsed_ms),
            self.message.clone().unwrap_or_default(),
        ]
    }
}

/// Turn an assertion result into a report.
///
/// Assertion failures become failed reports; anything else (bad config,
/// temp file trouble, a program that cannot start) is a setup error.
pub fn finish(
    check: &'static str,
    target: String,
    started: Instant,
    result: E2eResult<()>,
) -> Result<Report> {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let message = match result {
        Ok(()) => None,
        Err(
            e @ (E2eError::AssertionFailed { .. }
            | E2eError::UnexpectedSuccess { .. }
            | E2eError::CommandFailed { .. }),
        ) => Some(e.to_string()),
        Err(e) => return Err(e).with_context(|| format!("{check} {target}")),
    };

    Ok(Report {
        check,
        target,
        passed: message.is_none(),
        elapsed_ms,
        message,
    })
}

pub fn print_report(report: &Report, format: OutputFormat) {
    match format {
        OutputFormat::Plain if report.passed => {
            print_success(&format!(
                "{} {} ({} ms)",
                report.check, report.target, report.elapsed_ms
            ));
        }
        OutputFormat::Plain => {
            print_error(&format!("{} {}", report.check, report.target));
            if let Some(message) = &report.message {
                eprintln!("{message}");
            }
        }
        _ => print_item(report, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_failures_are_reports() {
        let result = Err(E2eError::AssertionFailed {
            command: "[echo hi]".into(),
            diagnostic: "did not output the expected substring(s): bye".into(),
        });
        let report = finish("contains", "[echo hi]".into(), Instant::now(), result).unwrap();
        assert!(!report.passed);
        assert!(report.message.unwrap().contains("bye"));
    }

    #[test]
    fn setup_errors_propagate() {
        let result = Err(E2eError::Config("bad".into()));
        assert!(finish("run", "[x]".into(), Instant::now(), result).is_err());
    }

    #[test]
    fn launch_errors_propagate() {
        let result = Err(E2eError::Spawn {
            program: "kubectl".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        let err = finish("run", "[kubectl]".into(), Instant::now(), result).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to start kubectl"));
    }

    #[test]
    fn passing_report_has_no_message() {
        let report = finish("run", "[true]".into(), Instant::now(), Ok(())).unwrap();
        assert!(report.passed);
        assert_eq!(report.row()[2], "pass");
    }
}
