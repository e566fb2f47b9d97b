mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use lsys::history::{FileHistory, HistoryRecorder, NoHistory};
use lsys::parser;
use lsys::render::{self, turtle::TurtleCanvas};
use lsys::rewriter::Rewriter;

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install log subscriber")?;

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let grammar = parser::parse_file(&cli.file)?;

    let history: Box<dyn HistoryRecorder> = match &cli.history {
        Some(path) => Box::new(FileHistory::new(path)),
        None => Box::new(NoHistory)
    };
    let rng: Box<dyn RngCore> = match cli.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(thread_rng())
    };

    let mut rewriter = Rewriter::with_rng(history, rng);
    let result = rewriter.process(&grammar, cli.iterations)?;

    if !cli.quiet {
        println!("{}", result);
    }

    if let Some(path) = &cli.export {
        let mut canvas = TurtleCanvas::new();
        render::render(&grammar, &result, &mut canvas)?;
        canvas
            .save_svg(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), segments = canvas.segments().len(), "exported drawing");
    }

    Ok(())
}
