//! gridwell CLI
//!
//! Run a headless host that plugin processes can attach to.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridwell_app::{builtin_modules, init_logging, DataDir, Host, Settings};
use gridwell_bridge::{Opcode, PROTOCOL_VERSION};
use gridwell_paint::RecordingBackend;
use tracing::info;

#[derive(Parser)]
#[command(name = "gridwell")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "gridwell plugin host", long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the host headless, accepting remote plugins.
    Serve {
        /// Data directory (settings, saved state, translations, assets).
        #[arg(short, long, default_value = ".")]
        data_dir: PathBuf,

        /// Listen address for remote plugins (overrides settings).
        #[arg(short, long)]
        listen: Option<String>,

        /// Stop after this many ticks.
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Milliseconds between ticks.
        #[arg(long, default_value = "16")]
        interval: u64,

        /// Extra plugin to host (repeatable).
        #[arg(short, long = "plugin")]
        plugins: Vec<String>,
    },

    /// Write a default settings file.
    Init {
        #[arg(short, long, default_value = ".")]
        data_dir: PathBuf,

        /// Overwrite an existing settings file.
        #[arg(long)]
        force: bool,
    },

    /// Print the opcode table.
    Opcodes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            data_dir,
            listen,
            ticks,
            interval,
            plugins,
        } => cmd_serve(&data_dir, listen, ticks, interval, plugins),
        Commands::Init { data_dir, force } => cmd_init(&data_dir, force),
        Commands::Opcodes => cmd_opcodes(),
    }
}

fn cmd_serve(
    data_dir: &Path,
    listen: Option<String>,
    ticks: Option<u64>,
    interval: u64,
    plugins: Vec<String>,
) -> Result<()> {
    let data = DataDir::new(data_dir);
    let mut settings = Settings::load(&data.settings_path())
        .with_context(|| format!("Failed to load settings from {}", data_dir.display()))?;
    if listen.is_some() {
        settings.listen = listen;
    } else if settings.listen.is_none() {
        settings.listen = Some("127.0.0.1:7420".to_string());
    }
    settings.plugins.extend(plugins);

    let modules = builtin_modules(&settings);
    let mut host = Host::new(settings, data, &modules).context("Failed to start host")?;
    if let Some(addr) = host.listener_addr() {
        info!("Waiting for plugins on {}", addr);
    }

    let mut backend = RecordingBackend::new(1);
    let interval = Duration::from_millis(interval);

    loop {
        let started = Instant::now();
        host.tick(&mut backend);

        if ticks.is_some_and(|limit| host.ticks() >= limit) {
            break;
        }
        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    let frame_commands = backend.last_frame().map(|f| f.command_count()).unwrap_or(0);
    info!(ticks = host.ticks(), frame_commands, "Shutting down");
    host.shutdown().context("Failed to save state")?;
    Ok(())
}

fn cmd_init(data_dir: &Path, force: bool) -> Result<()> {
    let data = DataDir::new(data_dir);
    let path = data.settings_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Settings::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn cmd_opcodes() -> Result<()> {
    println!("protocol version {}", PROTOCOL_VERSION);
    for op in Opcode::ALL {
        println!("{:>5}  {}", op.code(), op.name());
    }
    Ok(())
}
