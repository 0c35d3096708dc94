//! elephant HTTP server.

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use elephant_api::{router, ApiConfig, AppState};
use elephant_store::Store;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const DEFAULT_LOG_FILTER: &str = "elephant_api=debug,elephant_store=debug,tower_http=debug";

/// Where log lines go: a daily rolling file under `LOG_FILE`, else stdout.
fn log_writer(log_file: Option<&str>) -> (BoxMakeWriter, Option<WorkerGuard>) {
    let Some(path) = log_file else {
        return (BoxMakeWriter::new(std::io::stdout), None);
    };
    let path = Path::new(path);
    let dir = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("elephant-api.log");
    let appender = tracing_appender::rolling::daily(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    (BoxMakeWriter::new(writer), Some(guard))
}

/// Install the global subscriber.
///
/// `LOG_FORMAT` selects `json` or text, `LOG_FILE` enables file output,
/// `LOG_ANSI` forces colors on or off and `RUST_LOG` sets the filter.
/// The returned guard must be held for file output to be flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let log_file = env::var("LOG_FILE").ok().filter(|p| !p.is_empty());
    let (writer, guard) = log_writer(log_file.as_deref());
    // Files get plain text unless colors are asked for
    let ansi = env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(guard.is_none());

    let output: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(ansi).with_writer(writer).boxed()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry().with(output).with(filter).init();

    info!(
        json,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = ApiConfig::from_env()?;
    info!(
        data_dir = %config.data_dir.display(),
        auth_required = config.auth_required,
        utc_offset = %config.utc_offset,
        "Configuration loaded"
    );

    let store = Store::open(config.store_config()).await?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = router(AppState::new(store, config));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
