//! Manifest application

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use kube_e2e::Asserter;

use super::{finish, Report};

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest to apply; read from stdin when omitted
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Impersonate this user (kubectl --as)
    #[arg(long = "as", value_name = "USER")]
    pub user: Option<String>,

    /// Require the apply to be rejected
    #[arg(long)]
    pub expect_failure: bool,
}

pub fn execute(k: &Asserter, args: ApplyArgs) -> Result<Report> {
    let (yaml, source) = match &args.file {
        Some(path) => (
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            path.display().to_string(),
        ),
        None => {
            let mut yaml = String::new();
            std::io::stdin()
                .read_to_string(&mut yaml)
                .context("Failed to read manifest from stdin")?;
            (yaml, "<stdin>".to_string())
        }
    };

    let target = match &args.user {
        Some(user) => format!("{source} as {user}"),
        None => source,
    };

    let started = Instant::now();
    let result = match (args.user.as_deref(), args.expect_failure) {
        (None, false) => k.must_apply_yaml(&yaml),
        (None, true) => k.must_not_apply_yaml(&yaml),
        (Some(user), false) => k.must_apply_yaml_as_user(&yaml, user),
        (Some(user), true) => k.must_not_apply_yaml_as_user(&yaml, user),
    };
    let check = if args.expect_failure { "apply-denied" } else { "apply" };
    finish(check, target, started, result)
}
