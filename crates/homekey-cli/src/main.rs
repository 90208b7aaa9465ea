//! HomeKey lock runtime against simulated hardware.
//!
//! `run` boots the actuation workers and the card loop on mock peripherals
//! with the configuration and reader identity loaded from a SQLite store.
//! The `config` and `reader` subcommands operate on the same store.
//!
//! Logging is controlled through `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=homekey_reader=debug`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use homekey_actuation::{Actuators, Peripherals, WorkerSettings};
use homekey_config::{ConfigEngine, ConfigRequest, Section};
use homekey_core::config_channel;
use homekey_hardware::mock::{MockAccessory, MockGpio, MockNfcBus, MockPixel, Presentation};
use homekey_hardware::{AccessoryStore, AnyNfcBus};
use homekey_reader::{
    AnyAuthenticator, AuthOutcome, CardReader, IdentityService, KeyFlow, MockAuthenticator,
    ReaderSettings,
};
use homekey_storage::{
    AnyBlobStore, ConfigRepository, Database, ReaderDataRepository, SqliteBlobStore, StoreConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "homekey")]
#[command(version, about = "HomeKey door-lock runtime", long_about = None)]
struct Args {
    /// SQLite store holding MISCDATA and READERDATA
    #[arg(long, default_value = "homekey.db", global = true)]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the lock until Ctrl-C
    Run {
        /// Authentication flow: 0 = FAST, 1 = STANDARD, 2 = ATTESTATION
        #[arg(long, default_value_t = 0)]
        key_flow: u8,

        /// Present an accepted HomeKey card every N seconds
        #[arg(long, value_name = "SECS")]
        simulate_card: Option<u64>,
    },
    /// Read, apply or clear a configuration section
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Reader identity maintenance
    Reader {
        #[command(subcommand)]
        action: ReaderAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print a section (actions, misc, hkinfo)
    Get { section: String },
    /// Apply a partial JSON document to a section
    Apply { section: String, document: String },
    /// Reset a section to defaults
    Clear { section: String },
    /// Print supported Ethernet chips and board presets
    Ethernet,
}

#[derive(Subcommand, Debug)]
enum ReaderAction {
    /// Print the reader identity
    Info,
    /// Forget every endpoint, keeping the issuers
    RemoveEndpoints,
    /// Erase the reader identity
    Erase,
}

/// Everything `boot` wires together.
struct Runtime {
    engine: ConfigEngine,
    accessory: Arc<MockAccessory>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let store = open_store(&args.db).await?;

    match args.command {
        Command::Run {
            key_flow,
            simulate_card,
        } => run(store, key_flow, simulate_card).await,
        Command::Config { action } => config(store, action).await,
        Command::Reader { action } => reader(store, action).await,
    }
}

async fn open_store(path: &str) -> Result<Arc<AnyBlobStore>> {
    let db = Database::new(StoreConfig::new(path))
        .await
        .with_context(|| format!("opening store {}", path))?;
    Ok(Arc::new(AnyBlobStore::Sqlite(SqliteBlobStore::new(db))))
}

/// Load both records and boot the workers on mock peripherals.
async fn boot(store: &Arc<AnyBlobStore>) -> Runtime {
    let configs = ConfigRepository::config(Arc::clone(store));
    let (writer, config) = config_channel(configs.load().await);

    let (gpio, _) = MockGpio::new();
    let (pixel, _) = MockPixel::new();
    let (accessory, _) = MockAccessory::new();
    let accessory = Arc::new(accessory);
    let peripherals = Peripherals {
        gpio: Arc::new(gpio),
        pixel: Arc::new(pixel),
        accessory: accessory.clone(),
    };

    let mut actuators = Actuators::new(peripherals, config, WorkerSettings::default());
    let report = actuators.boot().await;
    info!("Workers started: {:?}", report.started);

    let identity = IdentityService::load(
        ReaderDataRepository::reader_data(Arc::clone(store)),
        accessory.clone(),
    )
    .await;

    Runtime {
        engine: ConfigEngine::new(writer, actuators, configs, identity),
        accessory,
    }
}

async fn run(store: Arc<AnyBlobStore>, key_flow: u8, simulate_card: Option<u64>) -> Result<()> {
    let flow = KeyFlow::try_from(key_flow)?;
    let Runtime { engine, accessory } = boot(&store).await;

    let (bus, bus_handle) = MockNfcBus::new();
    let (auth, auth_handle) = MockAuthenticator::new();
    let identity = engine.identity().snapshot().await;
    if let Some(issuer) = identity.issuers.first() {
        auth_handle.set_fallback(AuthOutcome::success(issuer.issuer_id.clone(), vec![0x01; 6]));
    } else {
        warn!("Reader is not provisioned, every card will be rejected");
    }

    let card_reader = CardReader::new(
        AnyAuthenticator::Mock(auth),
        engine.actuators().dispatch(),
        accessory.clone() as Arc<dyn AccessoryStore>,
        engine.reader(),
        engine.identity().shared(),
        ReaderSettings::default().key_flow(flow),
    );
    let handle = card_reader.spawn(AnyNfcBus::Mock(bus));
    let mut events = handle.subscribe();
    info!("Reader running with key flow {}", flow);

    let simulator = simulate_card.map(|secs| {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                bus_handle.present(Presentation::homekey(vec![0x04, 0x11, 0x22, 0x33]));
            }
        })
    });

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Could not encode event: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Dropped {} reader event(s)", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    if let Some(simulator) = simulator {
        simulator.abort();
    }
    let stats = handle.stats();
    let termination = handle.shutdown().await;
    info!("Reader ended: {:?}, stats: {:?}", termination, stats);
    for (kind, termination) in engine.into_actuators().shutdown().await {
        info!("{} worker ended: {:?}", kind, termination);
    }
    info!("Lock state at exit: {}", accessory.current_state());
    Ok(())
}

async fn config(store: Arc<AnyBlobStore>, action: ConfigAction) -> Result<()> {
    let Runtime { mut engine, .. } = boot(&store).await;

    let request = match action {
        ConfigAction::Get { section } => ConfigRequest::Get { section },
        ConfigAction::Apply { section, document } => ConfigRequest::Save {
            section,
            body: document,
        },
        ConfigAction::Clear { section } => ConfigRequest::Clear { section },
        ConfigAction::Ethernet => {
            println!("{}", serde_json::to_string_pretty(&engine.ethernet_info())?);
            engine.into_actuators().shutdown().await;
            return Ok(());
        }
    };

    let response = request.handle(&mut engine).await;
    engine.into_actuators().shutdown().await;
    if response.is_success() {
        println!("{}", response.body);
        Ok(())
    } else {
        anyhow::bail!("{} {}", response.status, response.body)
    }
}

async fn reader(store: Arc<AnyBlobStore>, action: ReaderAction) -> Result<()> {
    let Runtime { engine, .. } = boot(&store).await;
    let identity = engine.identity();

    match action {
        ReaderAction::Info => {
            let info = engine.get(Section::HkInfo).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        ReaderAction::RemoveEndpoints => {
            let removed = identity.remove_endpoints().await?;
            println!("Removed {} endpoint(s)", removed);
        }
        ReaderAction::Erase => {
            identity.erase().await?;
            println!("Reader data erased");
        }
    }
    engine.into_actuators().shutdown().await;
    Ok(())
}
