use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use time::Time;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use good_morning::{
    AppState, DEFAULT_MORNING_TIME, build_router, graceful_shutdown, logging_middleware,
    parse_iso_time, timezone::LocalTimezone,
};

/// The REST API server for finding where in the world it is currently morning.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The address to serve the API from.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    address: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// The local time to search for when a request does not specify one, e.g. "07:30".
    #[arg(long, value_parser = parse_time_arg)]
    default_time: Option<Time>,

    /// The canonical name of the server's timezone, e.g. "Pacific/Auckland".
    ///
    /// Defaults to the timezone configured on the host.
    #[arg(long)]
    local_timezone: Option<String>,

    /// Seed for picking random locations, for reproducible responses.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_time_arg(text: &str) -> Result<Time, String> {
    parse_iso_time(text).map_err(|error| error.to_string())
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let local_timezone = match args.local_timezone {
        Some(name) => LocalTimezone::Named(name),
        None => LocalTimezone::System,
    };

    if let Err(error) = local_timezone.resolve() {
        tracing::warn!("{error}. Requests will fail until the local timezone can be resolved.");
    }

    let state = AppState::new(
        args.default_time.unwrap_or(DEFAULT_MORNING_TIME),
        local_timezone,
        args.seed,
    );
    tracing::debug!("Starting with {state:?}");

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let addr = SocketAddr::new(args.address, args.port);
    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
    }
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but errors are logged
        // where they are converted into responses, so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
