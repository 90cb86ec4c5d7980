use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod clock;
mod constants;
mod database;
mod display;
mod map;
mod nodes;
mod server;
mod settings;
mod simulator;
mod source;
mod telemetry;
mod views;

use database::NodeStore;
use display::{ElementId, TextBoard};
use map::MapScene;
use nodes::store_id;
use server::{start_server, AppState};
use settings::Settings;
use simulator::DroneSimulator;
use source::HttpTelemetrySource;
use views::{DroneView, NodeDetailView, NodeMapView, RefreshPeriods, ViewEvent};

#[derive(Parser)]
#[command(name = "fire_dashboard", version, about = "Fire monitoring dashboard: drone telemetry and sensor node maps")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the dashboard pages and the JSON API
    Serve {
        /// Settings file (defaults to dashboard.ini next to the executable)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Follow a running server's drone telemetry in the terminal
    Drone {
        /// Base URL of the server
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fetch a single reading, print it and exit
        #[arg(long)]
        once: bool,
    },
    /// Render a node list to a map scene and print it as JSON
    Nodes {
        /// JSON array of nodes, or a full store file
        file: PathBuf,
        /// Keep running the map clock after printing the scene
        #[arg(long)]
        watch: bool,
    },
    /// Print one node merged with its latest reading
    Node {
        /// JSON array of nodes, or a full store file
        file: PathBuf,
        /// `N1_2` or `1.2`
        id: String,
        /// Keep running the page clock after printing the node
        #[arg(long)]
        watch: bool,
    },
    /// Write a settings file with the default values
    InitConfig {
        path: Option<PathBuf>,
    },
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut settings = Settings::load(config.as_deref())?;
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    init_tracing(&settings);

    println!("🔥 Fire Dashboard v{} starting...", constants::API_VERSION);

    let store = match settings.nodes_file.as_deref() {
        Some(path) => {
            println!("🗄️  Loading nodes from {}", path);
            NodeStore::from_file(Path::new(path))?
        }
        None => {
            println!("🗄️  No node file configured, using the sample deployment");
            NodeStore::default()
        }
    };
    let node_count = store.node_count()?;
    println!("✅ {} node(s) loaded", node_count);
    tracing::info!(nodes = node_count, "node store ready");

    start_server(AppState::new(store, DroneSimulator::new(), settings)).await
}

fn print_board(board: &TextBoard) {
    println!("──────────────");
    for line in board.lines() {
        println!("{}", line);
    }
}

async fn follow_drone(url: String, config: Option<PathBuf>, once: bool) -> Result<()> {
    let settings = Settings::load(config.as_deref())?;
    init_tracing(&settings);

    let source = Arc::new(HttpTelemetrySource::new(&url)?);
    println!("🚁 Following drone telemetry from {}", source.url());

    let mut view = DroneView::new(
        MapScene::new(),
        TextBoard::all(),
        &settings.drone_image_url,
        RefreshPeriods::from(&settings),
    );

    if once {
        if !view.refresh(source.as_ref()).await {
            anyhow::bail!("No telemetry from {}", source.url());
        }
        print_board(view.surface());
        return Ok(());
    }

    let run = view.run(source, |event, view| match event {
        ViewEvent::Updated => print_board(view.surface()),
        ViewEvent::FetchFailed => println!("⚠️  Telemetry unavailable, keeping last values"),
        ViewEvent::ClockTick => {}
    });

    tokio::select! {
        _ = run => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
        }
    }

    match view.current() {
        Some(reading) => println!("👋 Stopped at {:.4}, {:.4}", reading.location.lat, reading.location.lon),
        None => println!("👋 Stopped before the first reading"),
    }
    Ok(())
}

/// Runs a view clock until ctrl-c.
async fn watch_clock<F: std::future::Future<Output = ()>>(clock: F) -> Result<()> {
    tokio::select! {
        _ = clock => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
        }
    }
    Ok(())
}

async fn render_node_file(path: &Path, watch: bool) -> Result<()> {
    let store = NodeStore::from_file(path)?;
    let nodes = store.all_nodes()?;
    let mut view = NodeMapView::new(
        MapScene::new(),
        TextBoard::with_targets(&[ElementId::DbUpdateTime, ElementId::CurrentTime, ElementId::CurrentDate]),
    );
    view.render(&nodes);

    println!("{}", serde_json::to_string_pretty(view.map())?);
    let summary = view.summary();
    eprintln!(
        "📍 {} marker(s): {} parent(s), {} child(ren), {} connector(s), {} skipped",
        summary.markers, summary.parents, summary.children, summary.connectors, summary.skipped
    );

    if watch {
        let period = RefreshPeriods::default().clock;
        watch_clock(view.run_clock(period, |view| {
            eprintln!("🕒 {}", view.surface().lines().join(" | "));
        }))
        .await?;
    }
    Ok(())
}

async fn show_node(path: &Path, id: &str, watch: bool) -> Result<()> {
    let store = NodeStore::from_file(path)?;
    let sid = store_id(id);
    let Some(node) = store.node_view(&sid)? else {
        anyhow::bail!("Node {} not found in {}", sid, path.display());
    };
    println!("{}", serde_json::to_string_pretty(&node)?);

    if watch {
        let mut view = NodeDetailView::new(TextBoard::with_targets(&[ElementId::CurrentTime, ElementId::CurrentDate]));
        let period = RefreshPeriods::default().clock;
        watch_clock(view.run_clock(period, |view| {
            eprintln!("🕒 {}", view.surface().lines().join(" | "));
        }))
        .await?;
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(Settings::config_path);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    Settings::default().save(&path)?;
    println!("✅ Wrote default settings to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve { config: None, host: None, port: None }) {
        Command::Serve { config, host, port } => serve(config, host, port).await,
        Command::Drone { url, config, once } => follow_drone(url, config, once).await,
        Command::Nodes { file, watch } => render_node_file(&file, watch).await,
        Command::Node { file, id, watch } => show_node(&file, &id, watch).await,
        Command::InitConfig { path } => init_config(path),
    }
}
