use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use planner::{
    AppState,
    config::Config,
    create_router,
    route_planner::{Derivation, PlannerSettings, RoutePlanner},
    routing::OpenRouteService,
    store::{JsonFileStore, MemoryStore, WaypointStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Cycle route planner: builds road-following routes from map clicks"
)]
struct Args {
    /// Address to listen on (overrides PLANNER_ADDR)
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Directory holding the persisted route (overrides PLANNER_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep the route in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planner=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(addr) = args.addr {
        config.bind_addr = addr;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let provider = OpenRouteService::from_config(&config)?;
    tracing::info!("routing through {}", provider.endpoint());

    let store: Arc<dyn WaypointStore> = if args.ephemeral {
        tracing::info!("running with an in-memory waypoint store");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("persisting waypoints under {}", config.data_dir.display());
        Arc::new(JsonFileStore::new(&config.data_dir))
    };

    let planner = RoutePlanner::restore(
        Arc::new(provider),
        store,
        PlannerSettings {
            cycling_speed_kmh: config.cycling_speed_kmh,
        },
    );
    if let Derivation::Failed(message) = planner.recompute().await {
        tracing::warn!("could not route the restored waypoints: {message}");
    }

    let app = create_router(AppState {
        planner: Arc::new(planner),
    });

    tracing::info!("starting planner on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
