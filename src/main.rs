use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use platform::{NetScriptLoader, ScriptLoader, SessionHost, StaticScriptLoader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracker::TrackerConfig;

mod scenario;

use scenario::{Scenario, ScriptOutcome};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Session link history tracker.
#[derive(Parser)]
#[command(name = "linktrail")]
#[command(about = "Replay browsing sessions through the link history tracker")]
#[command(version)]
struct Cli {
    /// Tracker configuration (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON scenario and print the stored history
    Replay {
        /// Scenario file
        scenario: PathBuf,

        /// Fetch the external script over HTTP instead of simulating it
        #[arg(long)]
        fetch_script: bool,

        /// How long to wait for a fetched script before replaying anyway
        #[arg(long, default_value_t = 10_000)]
        script_timeout_ms: u64,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Replay {
            scenario,
            fetch_script,
            script_timeout_ms,
        } => replay(&scenario, config, fetch_script, Duration::from_millis(script_timeout_ms)),
        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("failed to serialize config")?;
            print!("{text}");
            Ok(())
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(TrackerConfig::default()),
    }
}

fn replay(path: &Path, config: TrackerConfig, fetch_script: bool, script_timeout: Duration) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let loader: Box<dyn ScriptLoader> = if fetch_script {
        Box::new(NetScriptLoader::new())
    } else {
        match scenario.script {
            ScriptOutcome::Loaded => Box::new(StaticScriptLoader::loaded()),
            ScriptOutcome::Failed => Box::new(StaticScriptLoader::failed("simulated failure")),
        }
    };

    let mut host = SessionHost::new(&scenario.url, scenario.document()?, config, loader)
        .context("failed to set up page")?;
    host.activate();
    if fetch_script {
        host.wait_for_script(script_timeout);
    }
    scenario::replay(&mut host, &scenario.steps)?;

    let history = host.history();
    log::info!(
        target: "linktrail",
        "replay finished at {:?} with {} record(s), {} navigation(s)",
        host.now(),
        history.len(),
        host.navigations().len()
    );
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
