use autolocate::flow::{AcquisitionState, LocationAcquisitionFlow, Phase};
use autolocate::location::{
    BuiltinGeocoder, ConsolePermission, FixedPositionProvider, GeocodeProvider, IpPositionProvider,
    NominatimGeocoder, PermissionProvider, PermissionStatus, PositionProvider, StaticPermission,
};
use autolocate::server;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// autolocate — auto-detect your location
///
/// Asks for location permission, finds the current position, and
/// reverse-geocodes it into "City, Region". The final state is printed
/// as JSON on stdout.
///
/// Examples:
///   autolocate
///   autolocate --permission grant --offline
///   autolocate --lat 37.77 --lon -122.41
///   autolocate --serve --permission grant --port 8080
#[derive(Parser)]
#[command(name = "autolocate", version, about, long_about = None)]
struct Cli {
    /// Permission policy: "prompt" (ask on the terminal), "grant", or "deny".
    #[arg(long, default_value = "prompt", value_parser = parse_permission)]
    permission: PermissionMode,

    /// Fixed latitude (-90 to 90). Requires --lon. Without it, the
    /// position comes from IP geolocation.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Fixed longitude (-180 to 180). Requires --lat.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Offline mode: reverse-geocode against the built-in city dataset.
    #[arg(long)]
    offline: bool,

    /// Search radius for the built-in dataset, in kilometres.
    #[arg(long, default_value_t = autolocate::location::builtin::DEFAULT_RADIUS_KM, value_parser = parse_radius)]
    radius_km: f64,

    /// HTTP timeout for network providers, in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Run the HTTP API instead of a single detection.
    #[arg(long)]
    serve: bool,

    /// Bind address for --serve.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port for --serve.
    #[arg(long, short = 'p', default_value_t = 3000)]
    port: u16,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "autolocate=debug").
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionMode {
    Prompt,
    Grant,
    Deny,
}

fn parse_permission(s: &str) -> Result<PermissionMode, String> {
    match s.to_lowercase().as_str() {
        "prompt" | "ask" => Ok(PermissionMode::Prompt),
        "grant" | "granted" | "allow" => Ok(PermissionMode::Grant),
        "deny" | "denied" => Ok(PermissionMode::Deny),
        _ => Err(format!("Unknown permission mode '{}'. Use 'prompt', 'grant', or 'deny'.", s)),
    }
}

fn parse_radius(s: &str) -> Result<f64, String> {
    let radius: f64 = s.trim().parse().map_err(|e| format!("Invalid radius '{}': {}", s, e))?;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(format!("Radius must be a positive number of kilometres, got '{}'.", s));
    }
    Ok(radius)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|e| {
            eprintln!("Error: Invalid log level '{}': {}", cli.log_level, e);
            std::process::exit(1);
        });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.serve && cli.permission == PermissionMode::Prompt {
        eprintln!("Error: --serve cannot prompt for permission. Use --permission grant or deny.");
        std::process::exit(1);
    }

    let flow = Arc::new(build_flow(&cli));

    if cli.serve {
        server::start(&cli.host, cli.port, flow).await;
        return;
    }

    let state = detect(&flow).await;
    flow.teardown();

    match serde_json::to_string_pretty(&state) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: Cannot serialize state: {}", e),
    }

    if state.phase != Phase::Succeeded {
        std::process::exit(1);
    }
}

fn build_flow(cli: &Cli) -> LocationAcquisitionFlow {
    let timeout = Duration::from_secs(cli.timeout_secs);

    let permission: Arc<dyn PermissionProvider> = match cli.permission {
        PermissionMode::Prompt => Arc::new(ConsolePermission),
        PermissionMode::Grant => Arc::new(StaticPermission(PermissionStatus::Granted)),
        PermissionMode::Deny => Arc::new(StaticPermission(PermissionStatus::Denied)),
    };

    let position: Arc<dyn PositionProvider> = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => match FixedPositionProvider::new(lat, lon) {
            Some(p) => Arc::new(p),
            None => {
                eprintln!("Error: Invalid coordinates. Lat: -90..90, Lon: -180..180");
                std::process::exit(1);
            }
        },
        _ => Arc::new(IpPositionProvider::new(timeout)),
    };

    let geocoder: Arc<dyn GeocodeProvider> = if cli.offline {
        Arc::new(BuiltinGeocoder::new(cli.radius_km))
    } else {
        Arc::new(NominatimGeocoder::new(timeout))
    };

    LocationAcquisitionFlow::new(permission, position, geocoder)
}

/// Run one attempt, rendering each state change to stderr.
async fn detect(flow: &Arc<LocationAcquisitionFlow>) -> AcquisitionState {
    let mut rx = flow.subscribe();
    let Some((_, handle)) = flow.spawn_request() else {
        return flow.state();
    };

    let mut shown_coords = false;
    loop {
        let state = rx.borrow_and_update().clone();
        match state.phase {
            Phase::Loading => {
                if let Some(coords) = state.coordinates.filter(|_| !shown_coords) {
                    eprintln!("  \u{1F4D0} {}", coords);
                    shown_coords = true;
                } else if !shown_coords {
                    eprintln!("  \u{23F3} {}", state.status_line());
                }
            }
            Phase::Succeeded => {
                eprintln!("  \u{1F4CD} {}", state.status_line());
                break;
            }
            Phase::Failed => {
                eprintln!("  \u{274C} {}", state.status_line());
                break;
            }
            Phase::Idle => {}
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    if let Err(e) = handle.await {
        tracing::error!(error = %e, "location attempt task failed");
    }
    flow.state()
}
