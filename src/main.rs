use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hook_taps::hooks::{HookSet, HooksConfig, SAMPLE_CONFIG};
use hook_taps::platform_dirs;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hook-taps",
    version,
    about = "Run hooks declared in a TOML file"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call a hook and print its result as JSON.
    Run {
        /// Name of the hook to call
        hook: String,

        /// Call arguments as a JSON array
        #[arg(long, default_value = "[]")]
        args: String,

        /// Hooks file (default: hooks.toml in the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List declared hooks with their kind and tap count.
    List {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a sample hooks file.
    Init {
        /// Destination (default: hooks.toml in the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run { hook, args, config } => run_hook(&hook, &args, config).await,
        Command::List { config } => list_hooks(config),
        Command::Init {
            path,
            stdout,
            force,
        } => init_config(path, stdout, force),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<HooksConfig> {
    let path = match path {
        Some(path) => path,
        None => platform_dirs::default_config_path()?,
    };
    HooksConfig::from_file(&path)
        .with_context(|| format!("Failed to load hooks from {}", path.display()))
}

async fn run_hook(name: &str, args: &str, config: Option<PathBuf>) -> Result<()> {
    let args: Vec<Value> =
        serde_json::from_str(args).context("--args must be a JSON array")?;
    let set = HookSet::from_config(&load_config(config)?)?;

    info!(hook = name, args = args.len(), "Running hook");
    let result = set.run(name, args).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn list_hooks(config: Option<PathBuf>) -> Result<()> {
    let set = HookSet::from_config(&load_config(config)?)?;

    for (name, hook) in set.iter() {
        println!("{name}\t{}\t{} taps", hook.kind(), hook.len());
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>, stdout: bool, force: bool) -> Result<()> {
    if stdout {
        print!("{SAMPLE_CONFIG}");
        return Ok(());
    }

    let path = match path {
        Some(path) => path,
        None => platform_dirs::default_config_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        platform_dirs::ensure_dir(parent)?;
    }

    std::fs::write(&path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Created {}", path.display());
    Ok(())
}
