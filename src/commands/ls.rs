//! # Ls Command Implementation
//!
//! Lists the targets the repository's own configuration publishes: what a
//! downstream repository declaring this one as an upstream would receive.
//!
//! ## Functionality
//!
//! - **Target Listing**: runs Include, Exclude, Rename and Template over the
//!   repository's tracked files
//! - **Pattern Filtering**: `--pattern` filters by output key, after renames
//! - **Detailed Output**: `--long` adds mode, size and source path
//! - **JSON**: `--json` prints the mapping as an object keyed by output key
//!
//! This command is read-only.

use anyhow::Result;
use clap::Args;

use commonrepo::git;
use commonrepo::output;
use commonrepo::pipeline;
use commonrepo::suggestions;
use commonrepo::targets::{TargetMap, TargetSet};
use commonrepo::view::FileView;

use super::{format_permissions, format_size, RepoArgs};

/// List the targets published by the repository's configuration
#[derive(Args, Debug)]
pub struct LsArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Only show targets whose output key matches this glob (e.g. "docs/**").
    #[arg(short, long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Use long listing format showing mode, size and source path.
    #[arg(short, long)]
    pub long: bool,

    /// Print the targets as JSON.
    #[arg(long, conflicts_with = "long")]
    pub json: bool,
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs) -> Result<()> {
    let config = args.repo.load_config()?;
    let view = git::open_view(&args.repo.repo);
    let mut set = TargetSet::new(view);

    pipeline::run(&mut set, &config).map_err(suggestions::explain)?;
    let targets = match &args.pattern {
        Some(pattern) => set.glob_targets(pattern),
        None => set.targets(),
    }
    .map_err(suggestions::explain)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    if targets.is_empty() {
        println!("No targets selected.");
        return Ok(());
    }

    if args.long {
        print_long(set.view(), &targets)?;
    } else {
        for key in targets.keys() {
            println!("{}", key);
        }
    }

    println!();
    println!("{} target(s)", targets.len());
    Ok(())
}

fn print_long(view: &dyn FileView, targets: &TargetMap) -> Result<()> {
    for (key, target) in targets {
        let stat = view.stat(&target.name).map_err(suggestions::explain)?;
        let marker = if target.is_template() { "T" } else { "-" };
        let source = if *key == target.name {
            String::new()
        } else {
            format!(" <- {}", target.name)
        };
        println!(
            "{}{} {:>8} {}{}",
            marker,
            format_permissions(stat.mode),
            format_size(stat.size),
            output::key(key),
            output::dim(source)
        );
    }
    Ok(())
}
