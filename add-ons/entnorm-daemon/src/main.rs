//! entnorm: command-line batch runner for entity normalization.

mod demo;

use clap::{Parser, Subcommand, ValueEnum};
use entnorm_core::{BatchMode, CoreConfig, KnowledgeBase};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "entnorm")]
#[command(about = "Resolve noisy entity mentions into canonical records")]
struct Args {
    /// JSON fixture file `{query: [candidates]}` used instead of web search
    #[arg(long, global = true, env = "ENTNORM_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Also print the clustered (canonical → mentions) view of each touched category
    #[arg(long, global = true)]
    group: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one batch of mentions against a category
    Resolve {
        #[arg(short, long)]
        category: String,

        #[arg(short, long, value_enum, default_value_t = Mode::Cascade)]
        mode: Mode,

        /// Fuzzy mode only; defaults to the configured threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// File with one mention per line (blank lines skipped)
        #[arg(short, long)]
        input: Option<PathBuf>,

        mentions: Vec<String>,
    },
    /// Run the built-in sample batches and print the knowledge base
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Cascade,
    Structured,
    Fuzzy,
}

impl Mode {
    fn batch_mode(self, threshold: Option<f64>) -> BatchMode {
        match self {
            Mode::Cascade => BatchMode::Cascade,
            Mode::Structured => BatchMode::Structured,
            Mode::Fuzzy => BatchMode::Fuzzy { threshold },
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[entnorm] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = CoreConfig::load()?;
    let kb = config.knowledge_base()?;
    let resolver = entnorm_skills::build_resolver(&config, args.fixtures.as_deref())?;
    tracing::info!(app = %config.app_name, oracle = resolver.oracle_name(), "entnorm starting");

    match args.command {
        Command::Resolve {
            category,
            mode,
            threshold,
            input,
            mut mentions,
        } => {
            if let Some(path) = input {
                mentions.extend(read_mentions(&path)?);
            }
            let report = resolver
                .run_batch(mode.batch_mode(threshold), &mentions, &category, &kb)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            print_category(&kb, &category, args.group).await?;
        }
        Command::Demo => {
            let reports = demo::run(&resolver, &kb).await?;
            for report in &reports {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            tracing::info!(batches = reports.len(), "Demo finished");
            for name in kb.category_names() {
                print_category(&kb, name, args.group).await?;
            }
        }
    }
    Ok(())
}

fn read_mentions(path: &std::path::Path) -> Result<Vec<String>, BoxError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("reading {}: {}", path.display(), e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

async fn print_category(kb: &KnowledgeBase, name: &str, group: bool) -> Result<(), BoxError> {
    let snapshot = kb.snapshot(name).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    if group {
        let clusters = kb.grouped(name).await?;
        println!("{}", serde_json::to_string_pretty(&clusters)?);
    }
    Ok(())
}
