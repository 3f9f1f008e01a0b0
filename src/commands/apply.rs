//! # Apply Command Implementation
//!
//! Composes the targets of every upstream the repository's configuration
//! declares and writes them into the repository (or `--output`).
//!
//! ## Process
//!
//! 1.  **Chain**: resolve the upstream chain from the repository's config.
//! 2.  **Compose**: resolve each declared upstream on its own target set and
//!     layer them, later upstreams winning. Upstreams of upstreams are not
//!     layered.
//! 3.  **Write**: render templated targets and write every file. With
//!     `--dry-run` the files are only listed.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use commonrepo::output;
use commonrepo::pipeline::Composer;
use commonrepo::render;
use commonrepo::suggestions;

use super::{format_size, RepoArgs};

/// Compose upstream targets and write them into the repository
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Directory to write into. Defaults to the repository root.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Show what would be written without writing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Execute the `apply` command.
pub fn execute(args: ApplyArgs) -> Result<()> {
    let config = args.repo.load_config()?;
    let source = args.repo.source();
    let chain = args.repo.chain(&source, &config)?;

    let plan = Composer::new(&source).compose(&chain).map_err(suggestions::explain)?;
    let output_dir = args.output.clone().unwrap_or_else(|| args.repo.repo.clone());
    let written =
        render::write_plan(&plan, &output_dir, args.dry_run).map_err(suggestions::explain)?;

    if written.is_empty() {
        println!("No files to write.");
        return Ok(());
    }

    for file in &written {
        println!(
            "{} {}",
            output::key(&file.key),
            output::dim(format!("<- {}:{}", file.source, file.name))
        );
    }

    let total: u64 = written.iter().map(|f| f.size as u64).sum();
    println!();
    if args.dry_run {
        println!(
            "{} file(s), {} total (dry run, nothing written)",
            written.len(),
            format_size(total)
        );
    } else {
        println!(
            "{} file(s), {} written to {}",
            written.len(),
            format_size(total),
            output_dir.display()
        );
    }
    Ok(())
}
