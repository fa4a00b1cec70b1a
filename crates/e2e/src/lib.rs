//! kubectl-driven E2E assertion helpers
//!
//! This crate runs external commands (mostly `kubectl`) and asserts on their
//! combined output, polling until a condition holds or a deadline passes:
//! - Tokenizes command-line fragments and captures stdout+stderr together
//! - Checks output for required or forbidden substrings
//! - Retries probes with a generic retry-until combinator
//! - Applies manifests from temporary files, optionally impersonating a user
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Asserter                            │
//! │    ├── must_run / must_not_run                              │
//! │    ├── run_should_contain / run_should_not_contain          │
//! │    ├── run_error_should_contain                             │
//! │    ├── field_should_contain / field_should_not_contain      │
//! │    └── must_apply_yaml[_as_user] / must_not_apply_yaml...   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  poll::retry_until(policy, probe) -> PollOutcome            │
//! │    └── probe: FnMut() -> Result<(), Diagnostic>             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  command::Runner::run(CommandLine) -> CommandOutput         │
//! │  matcher::check_contains_all / check_contains_none          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod command;
pub mod config;
pub mod error;
pub mod manifest;
pub mod matcher;
pub mod names;
pub mod poll;

pub use assertions::{Asserter, Field, FieldRef};
pub use command::{CommandLine, CommandOutput, Runner};
pub use config::AssertConfig;
pub use error::{E2eError, E2eResult};
pub use manifest::TempManifest;
pub use names::{generate_e2e_name, rand_str};
pub use poll::{retry_until, retry_until_async, Diagnostic, DiagnosticKind, PollOutcome, PollPolicy};

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
