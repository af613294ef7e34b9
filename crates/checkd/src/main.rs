//! checkd — check execution daemon.
//!
//! Serves the dispatcher over three plain-text routes:
//!
//! - `GET /check/{name}?arg=...&arg=...` — run a check, return its report
//! - `GET /update/{name}` — drop the cached routine so the next run reloads it
//! - `GET /` — invocation counters as JSON

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tracing::{info, Level};

use checkd_core::{
    init_tracing, DispatchError, Dispatcher, DispatcherConfig, GraphiteSink, MetricsSink,
    RoutineCache, ScriptLoader,
};

#[derive(Parser)]
#[command(name = "checkd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monitoring check execution daemon", long_about = None)]
struct Cli {
    /// Directory with check scripts
    #[arg(short = 'd', long, default_value = "/usr/lib/nagios/plugins")]
    check_dir: PathBuf,

    /// Logging level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Graphite host, specified as host:port
    #[arg(short = 'g', long)]
    graphite: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = 8111)]
    port: u16,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Run a check and return its report as plain text.
async fn run_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let args: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "arg")
        .map(|(_, value)| value)
        .collect();

    match state.dispatcher.handle(&name, &args).await {
        Ok(output) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            output,
        )
            .into_response(),
        Err(err @ DispatchError::NotFound { .. }) => {
            info!(check = %name, error = %err, "check not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Drop the cached routine for a check.
async fn update_check(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if state.dispatcher.reload(&name) {
        "Reloaded".into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Invocation counters for every check this daemon has run.
async fn counters(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.dispatcher.counters().await)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(counters))
        .route("/check/:name", get(run_check))
        .route("/update/:name", get(update_check))
        .with_state(state)
}

fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(log_level(&cli.log_level), cli.json);

    let cache = Arc::new(RoutineCache::new(Box::new(ScriptLoader::new(
        &cli.check_dir,
    ))));
    let mut dispatcher = Dispatcher::new(cache, DispatcherConfig::default());

    if let Some(graphite) = &cli.graphite {
        let sink = Arc::new(GraphiteSink::new(graphite.clone()));
        sink.ensure_started().await;
        dispatcher = dispatcher.with_sink(sink);
    }

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!(%addr, check_dir = %cli.check_dir.display(), "checkd listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkd_core::{CheckContext, CheckResult, CheckRoutine, Maximum, ResponseBuilder, StaticLoader};

    fn test_state() -> AppState {
        let routine: Arc<dyn CheckRoutine> =
            Arc::new(|ctx: &mut CheckContext, _args: &[String]| -> CheckResult {
                ResponseBuilder::new()
                    .add_rule("harrypotter", &Maximum::new(42.0, 108.0), 69.0)
                    .finish(ctx)
            });
        let cache = Arc::new(RoutineCache::new(Box::new(
            StaticLoader::new().with_routine("harrypotter", routine),
        )));
        AppState {
            dispatcher: Arc::new(Dispatcher::new(cache, DispatcherConfig::default())),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn test_check_route_returns_plain_text_report() {
        let state = test_state();
        let response = run_check(
            State(state),
            Path("harrypotter".to_string()),
            Query(Vec::new()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        let text = body_text(response).await;
        assert_eq!(
            text.trim_end(),
            "WARN: harrypotter: 69 > 42|'harrypotter'=69;42;108;;;"
        );
    }

    #[tokio::test]
    async fn test_unknown_check_is_404() {
        let state = test_state();
        let response = run_check(
            State(state.clone()),
            Path("voldemort".to_string()),
            Query(Vec::new()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // The failed lookup never counts as an invocation.
        let Json(counts) = counters(State(state)).await;
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn test_update_route_404s_until_cached() {
        let state = test_state();

        let response = update_check(State(state.clone()), Path("harrypotter".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        run_check(
            State(state.clone()),
            Path("harrypotter".to_string()),
            Query(Vec::new()),
        )
        .await;

        let response = update_check(State(state), Path("harrypotter".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Reloaded");
    }

    #[tokio::test]
    async fn test_root_route_reports_counters() {
        let state = test_state();
        run_check(
            State(state.clone()),
            Path("harrypotter".to_string()),
            Query(Vec::new()),
        )
        .await;

        let Json(counts) = counters(State(state)).await;
        assert_eq!(counts.get("harrypotter"), Some(&1));
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level("debug"), Level::DEBUG);
        assert_eq!(log_level("INFO"), Level::INFO);
        assert_eq!(log_level("bogus"), Level::WARN);
    }
}
