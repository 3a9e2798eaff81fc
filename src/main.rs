//! RFID reader supervisor - command line entry point

use clap::{Parser, Subcommand};
use rfid_supervisor::device::{DeviceEvent, ReachabilityProbe, TagRead, TcpProbe};
use rfid_supervisor::observability::{init_default_logging, init_logging, LogFormat};
use rfid_supervisor::testing::mocks::{MockAdminChannel, MockDeviceLink, MockProbe};
use rfid_supervisor::{ReaderSupervisor, SupervisorConfig};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, Level};

/// Supervise an RFID reader connection and its tag inventory
#[derive(Parser)]
#[command(name = "rfid-supervisor")]
#[command(about = "RFID reader connection supervisor and tag inventory pipeline")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Check once whether the configured reader answers on the network
    Probe,
    /// Run an inventory against a simulated reader and print events as JSON lines
    Simulate {
        /// Total tag reads to report
        #[arg(long, default_value_t = 200)]
        reads: usize,
        /// Distinct tags among the reads
        #[arg(long, default_value_t = 25)]
        unique: usize,
        /// Reads per report batch
        #[arg(long, default_value_t = 10)]
        batch: usize,
        /// Drop the connection halfway through the run
        #[arg(long)]
        drop_connection: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        1 => init_logging(Level::DEBUG, log_format_from_env(), false),
        _ => init_logging(Level::TRACE, log_format_from_env(), true),
    }

    info!("Starting rfid-supervisor v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Config { show } => handle_config_command(&config, show),
        Commands::Probe => probe_reader(&config).await,
        Commands::Simulate {
            reads,
            unique,
            batch,
            drop_connection,
        } => simulate(&config, reads, unique, batch, drop_connection).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn log_format_from_env() -> LogFormat {
    LogFormat::parse(&std::env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()))
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<SupervisorConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(SupervisorConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = ["reader.toml", "config/reader.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(SupervisorConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Provide one with -c/--config or create reader.toml".into())
        }
    }
}

fn handle_config_command(
    config: &SupervisorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(reader = %config.reader.name, "Configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

async fn probe_reader(config: &SupervisorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let probe = TcpProbe::new(config.reader.llrp_port, config.connection.probe_timeout());
    let address = &config.reader.address;

    if probe.is_reachable(address).await {
        println!("{} ({}:{}) is reachable", config.reader.name, address, config.reader.llrp_port);
        Ok(())
    } else {
        Err(format!(
            "{} ({}:{}) did not answer within {:?}",
            config.reader.name,
            address,
            config.reader.llrp_port,
            config.connection.probe_timeout()
        )
        .into())
    }
}

async fn simulate(
    config: &SupervisorConfig,
    reads: usize,
    unique: usize,
    batch: usize,
    drop_connection: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if unique == 0 || batch == 0 {
        return Err("--unique and --batch must be greater than 0".into());
    }

    let link = Arc::new(MockDeviceLink::new(config.reader.address.clone()));
    let supervisor = ReaderSupervisor::from_config(
        config,
        link.clone(),
        Arc::new(MockProbe::reachable()),
        Box::new(MockAdminChannel::new()),
    );
    let mut events = supervisor.subscribe_events();

    supervisor.start_reader().await;
    let run_id = supervisor.start_inventory().await?;
    info!(run_id = %run_id, reads, unique, "Simulated inventory started");

    let epcs: Vec<String> = (0..reads)
        .map(|i| format!("E280{:020X}", i % unique))
        .collect();
    for (index, chunk) in epcs.chunks(batch).enumerate() {
        if drop_connection && index == epcs.len() / batch / 2 {
            link.lose_connection();
            // Let the monitor bring the link back before reporting resumes
            sleep(config.connection.health_check_interval() * 2).await;
        }
        link.emit(DeviceEvent::TagsReported(
            chunk.iter().map(|epc| TagRead::new(epc.clone())).collect(),
        ));
    }

    supervisor.stop_inventory().await?;
    supervisor.end_reader().await?;

    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
