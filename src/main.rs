use anyhow::{bail, Context, Result};
use clap::Parser;
use sfta::{report, FaultTree};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Perform a slow fault tree analysis.
///
/// Reads a fault tree text file and writes summaries of its events, gates,
/// minimal cut sets, and contributions to the directory `<ft.txt>.out/`.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Fault tree text file
    #[arg(value_name = "ft.txt")]
    fault_tree: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    if cli.fault_tree.is_dir() {
        bail!("`{}` is a directory, not a file", cli.fault_tree.display());
    }
    let text = fs::read_to_string(&cli.fault_tree)
        .with_context(|| format!("unable to read `{}`", cli.fault_tree.display()))?;

    let tree = FaultTree::parse(&text)
        .with_context(|| format!("in `{}`", cli.fault_tree.display()))?;
    info!(
        events = tree.events().len(),
        gates = tree.gates().len(),
        "analysed fault tree"
    );

    let output = PathBuf::from(format!("{}.out", cli.fault_tree.display()));
    let cut_sets_directory = output.join("cut-sets");
    let contributions_directory = output.join("contributions");
    create_directory_robust(&output)?;
    create_directory_robust(&cut_sets_directory)?;
    create_directory_robust(&contributions_directory)?;

    report::events_table(&tree).write_tsv(&output.join("events.tsv"))?;
    report::gates_table(&tree).write_tsv(&output.join("gates.tsv"))?;
    for (gate_id, table) in report::cut_set_tables(&tree) {
        table.write_tsv(&cut_sets_directory.join(format!("{}.tsv", gate_id)))?;
    }
    for (gate_id, table) in report::contribution_tables(&tree) {
        table.write_tsv(&contributions_directory.join(format!("{}.tsv", gate_id)))?;
    }

    info!(output = %output.display(), "wrote analysis");
    Ok(())
}

/// Replace whatever occupies the path with a fresh empty directory.
fn create_directory_robust(path: &Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path)?;
    }
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir(path).with_context(|| format!("unable to create `{}`", path.display()))?;
    Ok(())
}
