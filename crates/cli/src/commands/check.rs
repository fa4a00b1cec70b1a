//! Command and field assertions

use std::time::Instant;

use anyhow::Result;
use clap::Args;
use tracing::debug;

use kube_e2e::{Asserter, CommandLine, Field, FieldRef};

use super::{finish, Report};

#[derive(Args)]
pub struct CommandArgs {
    /// Command line fragments. Each is split on spaces unless wrapped in
    /// double quotes, e.g. `sh -c '"echo a b"'`
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "FRAGMENT"
    )]
    pub cmdln: Vec<String>,
}

impl CommandArgs {
    fn command_line(&self) -> CommandLine {
        CommandLine::new(self.cmdln.iter().cloned())
    }
}

#[derive(Args)]
pub struct ContainsArgs {
    /// Substring to check for (repeatable)
    #[arg(short, long = "want", required = true, value_name = "SUBSTRING")]
    pub want: Vec<String>,

    #[command(flatten)]
    pub command: CommandArgs,
}

#[derive(Args)]
pub struct FieldArgs {
    /// Resource kind, e.g. pod or deployment
    #[arg(long)]
    pub kind: String,

    /// Namespace; omit for cluster-scoped resources
    #[arg(short, long, default_value = "")]
    pub namespace: String,

    /// Resource name
    #[arg(long)]
    pub name: String,

    /// Field path such as .status.phase
    #[arg(long)]
    pub field: String,

    /// Treat --field as a complete Go template instead of a path
    #[arg(long)]
    pub template: bool,

    /// Substring to check for (repeatable)
    #[arg(short, long = "want", required = true, value_name = "SUBSTRING")]
    pub want: Vec<String>,

    /// Require the substrings to be absent instead of present
    #[arg(long)]
    pub absent: bool,
}

impl FieldArgs {
    fn field_ref(&self) -> FieldRef {
        let field = if self.template {
            Field::template(&self.field)
        } else {
            Field::path(&self.field)
        };
        FieldRef::new(&self.kind, &self.namespace, &self.name, field)
    }
}

pub fn run(k: &Asserter, args: CommandArgs) -> Result<Report> {
    let cmd = args.command_line();
    let started = Instant::now();
    let result = k.must_run(cmd.clone());
    finish("run", cmd.to_string(), started, result)
}

pub fn fail(k: &Asserter, args: CommandArgs) -> Result<Report> {
    let cmd = args.command_line();
    let started = Instant::now();
    let result = k.must_not_run(cmd.clone());
    finish("fail", cmd.to_string(), started, result)
}

pub fn contains(k: &Asserter, args: ContainsArgs) -> Result<Report> {
    let cmd = args.command.command_line();
    let started = Instant::now();
    let result = k.run_should_contain(&args.want, cmd.clone());
    finish("contains", cmd.to_string(), started, result)
}

pub fn not_contains(k: &Asserter, args: ContainsArgs) -> Result<Report> {
    let cmd = args.command.command_line();
    let started = Instant::now();
    let result = k.run_should_not_contain(&args.want, cmd.clone());
    finish("not-contains", cmd.to_string(), started, result)
}

pub fn error_contains(k: &Asserter, args: ContainsArgs) -> Result<Report> {
    let cmd = args.command.command_line();
    let started = Instant::now();
    let result = k.run_error_should_contain(&args.want, cmd.clone());
    finish("error-contains", cmd.to_string(), started, result)
}

pub fn field(k: &Asserter, args: FieldArgs) -> Result<Report> {
    let field = args.field_ref();
    debug!("Field command: {}", k.field_command(&field));
    let started = Instant::now();
    let result = if args.absent {
        k.field_should_not_contain(&field, &args.want)
    } else {
        k.field_should_contain(&field, &args.want)
    };
    finish("field", field.to_string(), started, result)
}
