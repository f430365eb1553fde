use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use audio_session_router::catalog::{Port, ResolvedPort, translate};
use audio_session_router::config::{Config, ConfigLoader};
use audio_session_router::logging::{LoggingConfig, cleanup_old_logs, initialize_logging};
use audio_session_router::priority::PriorityOrder;
use audio_session_router::scenario::{Scenario, ScenarioRunner, native_id_for};
use audio_session_router::system::SimulatedAudioSession;
use audio_session_router::AudioSessionRouter;

#[derive(Parser)]
#[command(name = "audio-session-router")]
#[command(about = "Audio session output routing with priority-based automatic switching")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the output ports the router understands
    Ports,
    /// Validate configuration file
    CheckConfig,
    /// Show which output the policy picks for a set of connected ports
    Evaluate {
        /// Connected ports, as tokens or native ids
        #[arg(short = 'p', long, value_delimiter = ',')]
        connected: Vec<String>,
        /// Priority order to use instead of the configured one
        #[arg(short, long, value_delimiter = ',')]
        order: Option<Vec<String>>,
    },
    /// Apply a speaker/default override against a simulated session
    Override {
        /// `speaker` or `default`
        output: String,
        #[arg(short = 'p', long, value_delimiter = ',', default_value = "builtin-speaker")]
        connected: Vec<String>,
    },
    /// Replay a TOML scenario against a simulated session
    Scenario {
        /// Scenario file path
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::for_path(cli.config.as_deref())?;
    let config = loader.load_config()?;

    let (_guard, log_dir) = initialize_logging(LoggingConfig::from_config(&config, cli.verbose))?;
    if let Some(dir) = log_dir {
        if let Err(e) = cleanup_old_logs(&dir, config.general.log_retention_days) {
            warn!("Log cleanup failed: {}", e);
        }
    }

    info!("Starting audio session router");

    match cli.command {
        Commands::Ports => list_ports(),
        Commands::CheckConfig => check_config(&config, &loader.get_config_path().display().to_string()),
        Commands::Evaluate { connected, order } => evaluate(&config, &connected, order),
        Commands::Override { output, connected } => {
            override_output(&config, &output, &connected).await?
        }
        Commands::Scenario { file } => run_scenario(&config, &file).await?,
    }

    Ok(())
}

fn list_ports() {
    println!("Output ports:");
    for port in Port::ALL {
        let kind = if port.is_bluetooth() { " (bluetooth)" } else { "" };
        println!("  {:<18} {}{}", port.token(), port.native_id(), kind);
    }
}

fn check_config(config: &Config, path: &str) {
    info!("Validating configuration");

    println!("Configuration validation: {}", path);
    println!("  ✓ Configuration file parsed successfully");
    println!("  ✓ Auto-switch: {}", config.routing.auto_switch_bluetooth);
    println!("  ✓ Priority order: {}", config.routing.priority_order);
    println!("  ✓ Command timeout: {:?}", config.general.command_timeout());

    for warning in config.warnings() {
        println!("  ! {}", warning);
    }
}

fn resolve(connected: &[String]) -> Vec<ResolvedPort> {
    connected
        .iter()
        .map(|name| match Port::from_token(name) {
            Some(port) => ResolvedPort::Known(port),
            None => translate(name),
        })
        .collect()
}

fn evaluate(config: &Config, connected: &[String], order: Option<Vec<String>>) {
    let mut policy = config.routing.policy();
    if let Some(tokens) = order {
        policy.priority_order = PriorityOrder::from_tokens(&tokens);
    }

    let resolved = resolve(connected);
    let tokens: Vec<&str> = resolved.iter().map(|p| p.token()).collect();

    println!("Priority order: {}", policy.priority_order);
    println!("Connected: [{}]", tokens.join(", "));
    match policy.select_target(&resolved) {
        Some(port) => println!("Target: {}", port),
        None => println!("Target: none (route left unchanged)"),
    }
}

async fn override_output(config: &Config, output: &str, connected: &[String]) -> Result<()> {
    let session = SimulatedAudioSession::new();
    for port in connected {
        session.attach(&native_id_for(port));
    }

    let router = AudioSessionRouter::new(session, config)?;
    router.load()?;

    let outcome = router.override_output(output).await;
    router.settle().await;

    println!("{}", serde_json::to_string(&outcome)?);

    let outputs = router.current_outputs().await?;
    let tokens: Vec<&str> = outputs.iter().map(|p| p.token()).collect();
    println!("Current outputs: [{}]", tokens.join(", "));

    Ok(())
}

async fn run_scenario(config: &Config, file: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read scenario file: {}", file))?;
    let scenario = Scenario::from_toml(&content)?;

    let runner = ScenarioRunner::new(&scenario, config)?;
    for line in runner.run(&scenario).await? {
        println!("{}", line);
    }

    Ok(())
}
