//! # Upstreams Command Implementation
//!
//! Prints the resolved upstream chain, one `locator@ref` per line, starting
//! with the repository itself. Unpinned upstreams show the ref they resolve
//! to right now. `--json` prints the full descriptors including chain
//! position and nesting depth.

use anyhow::Result;
use clap::Args;

use commonrepo::output;

use super::RepoArgs;

/// Print the resolved upstream chain
#[derive(Args, Debug)]
pub struct UpstreamsArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Print the chain as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `upstreams` command.
pub fn execute(args: UpstreamsArgs) -> Result<()> {
    let config = args.repo.load_config()?;
    let source = args.repo.source();
    let chain = args.repo.chain(&source, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
        return Ok(());
    }

    for upstream in &chain {
        let indent = "  ".repeat(upstream.depth.saturating_sub(1));
        println!("{}{}", indent, output::locator(upstream.to_string()));
    }
    Ok(())
}
