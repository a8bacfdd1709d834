//! Memory-store lab tool: inspect, report on, and merge the agent's
//! cross-game memory files without a live game attached.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rampart::memory::{JsonFileStore, PersistentMemory};
use rampart::MemoryStore;

#[derive(Parser)]
#[command(name = "rampart", about = "Rampart agent memory tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a human-readable learning report from a memory file.
    Report {
        /// Path to the memory JSON file.
        path: PathBuf,
    },
    /// Additively merge memory files into one output file.
    Merge {
        /// Input memory files, merged in order.
        inputs: Vec<PathBuf>,
        /// Output path for the merged memory.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Dump a memory file as canonical JSON.
    Inspect { path: PathBuf },
}

fn load_memory(path: &PathBuf) -> Result<PersistentMemory> {
    let store = JsonFileStore::new(path);
    let snapshot = store
        .load()
        .with_context(|| format!("loading {}", path.display()))?
        .with_context(|| format!("no memory file at {}", path.display()))?;
    let mut memory = PersistentMemory::new();
    memory.merge(&snapshot);
    Ok(memory)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Report { path } => {
            let memory = load_memory(&path)?;
            print!("{}", memory.render_report());
        }
        Command::Merge { inputs, output } => {
            anyhow::ensure!(!inputs.is_empty(), "at least one input file required");
            let mut merged = PersistentMemory::new();
            for input in &inputs {
                let store = JsonFileStore::new(input);
                let snapshot = store
                    .load()
                    .with_context(|| format!("loading {}", input.display()))?
                    .with_context(|| format!("no memory file at {}", input.display()))?;
                merged.merge(&snapshot);
            }
            JsonFileStore::new(&output)
                .save(&merged.snapshot())
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "merged {} file(s) into {} ({} games)",
                inputs.len(),
                output.display(),
                merged.games_played
            );
        }
        Command::Inspect { path } => {
            let memory = load_memory(&path)?;
            println!("{}", serde_json::to_string_pretty(&memory.snapshot())?);
        }
    }
    Ok(())
}
