//! snapfind-api server binary.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snapfind_api::{
    build_rate_limiter, router, ApiConfig, AppState, SupabasePhotoSource, SupabaseTokenVerifier,
};
use snapfind_core::TokenVerifier;
use snapfind_match::{FaceMatchConfig, FaceMatcher};

const DEFAULT_LOG_FILTER: &str =
    "snapfind_api=debug,snapfind_match=debug,snapfind_inference=info,tower_http=debug";

/// Install the global subscriber from `LOG_FORMAT` (`json` or `text`),
/// `LOG_FILE` (daily-rolled file instead of stdout), `LOG_ANSI` and `RUST_LOG`.
///
/// The returned guard flushes the file writer and must outlive the server.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json");
    let ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");
    let log_file = std::env::var("LOG_FILE").ok();

    let (writer, guard) = match log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(daily_appender(path));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    // No colour codes in files unless asked for
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi.unwrap_or(guard.is_none()));

    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    );
    if json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }

    info!(
        log_format = if json { "json" } else { "text" },
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

fn daily_appender(path: &str) -> RollingFileAppender {
    let (dir, prefix) = split_log_path(Path::new(path));
    tracing_appender::rolling::daily(dir, prefix)
}

/// Directory and file-name prefix for the rolling log file.
fn split_log_path(path: &Path) -> (&Path, &OsStr) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = path
        .file_name()
        .unwrap_or(OsStr::new("snapfind-api.log"));
    (dir, prefix)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = ApiConfig::from_env()?;
    let match_config = FaceMatchConfig::from_env()?;
    info!(
        model = %match_config.oracle.model,
        batch_size = match_config.matcher.batch_size,
        concurrency = match_config.matcher.max_concurrent_batches,
        max_retries = match_config.matcher.max_retries,
        deadline_ms = match_config.matcher.deadline_ms,
        "Face matcher configured"
    );

    let matcher = Arc::new(FaceMatcher::from_config(match_config)?);
    let photos = Arc::new(SupabasePhotoSource::new(
        &config.supabase_url,
        &config.supabase_service_key,
    )?);
    let verifier: Option<Arc<dyn TokenVerifier>> = if config.require_auth {
        Some(Arc::new(SupabaseTokenVerifier::new(
            &config.supabase_url,
            &config.supabase_service_key,
        )?))
    } else {
        tracing::warn!("REQUIRE_AUTH is disabled, match-face accepts anonymous requests");
        None
    };

    let mut state =
        AppState::new(matcher, photos, verifier).with_candidate_limit(config.candidate_limit);
    if config.rate_limit_enabled {
        info!(
            requests = config.rate_limit_requests,
            period_secs = config.rate_limit_period_secs,
            "Rate limiting enabled"
        );
        state = state.with_rate_limiter(build_rate_limiter(
            config.rate_limit_requests,
            config.rate_limit_period_secs,
        )?);
    }

    let app = router(state, config.body_limit_bytes);

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("/var/log/snapfind/api.log")),
            (Path::new("/var/log/snapfind"), OsStr::new("api.log"))
        );
        assert_eq!(
            split_log_path(Path::new("api.log")),
            (Path::new("."), OsStr::new("api.log"))
        );
        assert_eq!(
            split_log_path(Path::new("/")),
            (Path::new("."), OsStr::new("snapfind-api.log"))
        );
    }
}
