use std::{env, net::SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use zenith_finance::{AppState, ChatRelay, RelayConfig, build_router, graceful_shutdown};

/// The chat relay server for Zenith Finance.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The chat-completions endpoint to relay requests to.
    #[arg(long, default_value = "https://api.openai.com/v1/chat/completions")]
    upstream_url: String,

    /// The model to request from the upstream endpoint.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let api_key = env::var("ZENITH_API_KEY")
        .expect("The environment variable 'ZENITH_API_KEY' must be set");

    let relay = ChatRelay::new(RelayConfig {
        endpoint: args.upstream_url,
        api_key,
        model: args.model,
    });
    let state = AppState::new(relay);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(filter::LevelFilter::INFO),
        )
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our
        // specific logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
