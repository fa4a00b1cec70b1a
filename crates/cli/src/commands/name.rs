use clap::Args;

use kube_e2e::{generate_e2e_name, rand_str};

#[derive(Args)]
pub struct NameArgs {
    /// Base resource name
    pub name: String,

    /// Test identifier included in the name
    pub test_prefix: String,

    /// Fixed random part; a fresh 8-character one is generated when omitted
    #[arg(long)]
    pub rand_prefix: Option<String>,
}

pub fn execute(args: NameArgs) {
    let rand_prefix = args.rand_prefix.unwrap_or_else(rand_str);
    println!(
        "{}",
        generate_e2e_name(&args.name, &args.test_prefix, &rand_prefix)
    );
}
