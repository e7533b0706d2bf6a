mod config;
mod input;
mod output;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use logsieve_filter::{FilterStore, LogLine};

use crate::config::Config;
use crate::output::{Printer, Stats};

/// logsieve - rule-driven filtering and highlighting of debug output
#[derive(Parser, Debug)]
#[command(name = "logsieve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file with PID<TAB>PROCESS<TAB>MESSAGE lines (stdin if omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Filter file to load (.json or .xml); repeat to merge several
    #[arg(short, long = "filter", value_name = "FILE")]
    filters: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name for the merged filter
    #[arg(long)]
    name: Option<String>,

    /// Write the merged filter to this file and exit
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Do not color output lines
    #[arg(long)]
    no_color: bool,

    /// Print counters to stderr when the input ends
    #[arg(long)]
    stats: bool,

    /// Only print lines matched by a Track rule
    #[arg(long)]
    only_tracked: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout carries filtered lines only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => config::load_from_file(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => Config::default(),
    };
    // Command line wins over the config file
    cfg.filters.extend(args.filters.iter().cloned());
    cfg.color &= !args.no_color;
    cfg.stats |= args.stats;
    cfg.only_tracked |= args.only_tracked;
    if !cfg.color {
        colored::control::set_override(false);
    }

    let store = FilterStore::new();
    for path in &cfg.filters {
        store
            .load(path)
            .with_context(|| format!("cannot load filter {}", path.display()))?;
    }
    if let Some(name) = &args.name {
        store.set_name(name.as_str());
    }
    store.set_process_colors(cfg.process_colors());

    let snapshot = store.snapshot();
    tracing::info!(
        name = snapshot.name(),
        message_rules = snapshot.message_rules().len(),
        process_rules = snapshot.process_rules().len(),
        "filter ready"
    );

    if let Some(path) = &args.save {
        store
            .save(path)
            .with_context(|| format!("cannot save filter {}", path.display()))?;
        return Ok(());
    }

    let (line_tx, line_rx) = mpsc::unbounded_channel::<LogLine>();
    let reader = input::spawn_reader(args.input.clone(), line_tx);

    let printer = Printer::new(cfg.color, cfg.only_tracked);
    let (stats, drained) = filter_lines(&store, &printer, line_rx, &mut io::stdout()).await?;

    if drained {
        let lines_read = reader.await.context("reader task failed")??;
        tracing::debug!(lines_read, "input finished");
    } else {
        reader.abort();
    }

    if cfg.stats {
        eprintln!("{}", stats.summary());
    }
    Ok(())
}

/// Evaluate every incoming line and print the ones that stay visible.
///
/// The flag is false when output stopped before the input was drained.
async fn filter_lines<W: Write>(
    store: &FilterStore,
    printer: &Printer,
    mut line_rx: mpsc::UnboundedReceiver<LogLine>,
    out: &mut W,
) -> Result<(Stats, bool)> {
    let mut stats = Stats::default();

    while let Some(line) = line_rx.recv().await {
        let (decision, eval) = store.evaluate_counted(&line);
        stats.record(&decision, eval);

        match printer.print(out, &line, &decision).and_then(|()| out.flush()) {
            Ok(()) => {}
            // Downstream pager or pipe went away
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok((stats, false)),
            Err(e) => return Err(e).context("cannot write output"),
        }
    }

    Ok((stats, true))
}
