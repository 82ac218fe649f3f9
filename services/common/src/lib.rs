use std::{
    env,
    fs,
    io,
    net::SocketAddr,
    panic,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const DEFAULT_LOG_DIR: &str = "/var/log/vitals";

pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_tracing(service_name: &str) -> TracingGuards {
    // RUST_LOG overrides the default info filter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_root = log_root(service_name);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);
    let mut file_guard: Option<WorkerGuard> = None;
    let mut file_layer = None;

    // A read-only or missing log dir degrades to stdout only.
    if fs::create_dir_all(&log_root).is_ok() {
        let appender = panic::catch_unwind(|| {
            tracing_appender::rolling::daily(&log_root, format!("{service_name}.log"))
        })
        .ok();

        if let Some(appender) = appender {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_layer = Some(fmt::layer().with_ansi(false).with_writer(writer));
            file_guard = Some(guard);
        }
    }

    if let Some(layer) = file_layer {
        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_layer)
            .with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = Registry::default().with(filter).with(stdout_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    if file_guard.is_some() {
        let retention_days = env_or("LOG_RETENTION_DAYS", 14u64);
        let cleanup_interval = env_or("LOG_CLEANUP_INTERVAL_MINUTES", 360u64);
        spawn_log_cleanup(log_root, retention_days, cleanup_interval);
    }

    TracingGuards {
        _file_guard: file_guard,
    }
}

fn log_root(service_name: &str) -> PathBuf {
    let log_dir = env_opt("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
    PathBuf::from(log_dir).join(service_name)
}

/// Typed environment lookup with a fallback for missing or unparsable values.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

/// Non-empty environment string, trimmed.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn spawn_log_cleanup(log_root: PathBuf, retention_days: u64, cleanup_interval_minutes: u64) {
    if retention_days == 0 || cleanup_interval_minutes == 0 {
        return;
    }

    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let interval = Duration::from_secs(cleanup_interval_minutes * 60);

    thread::spawn(move || loop {
        if let Some(cutoff) = SystemTime::now().checked_sub(retention) {
            cleanup_old_logs(&log_root, cutoff);
        }
        thread::sleep(interval);
    });
}

fn cleanup_old_logs(root: &Path, cutoff: SystemTime) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            cleanup_old_logs(&path, cutoff);
            continue;
        }
        let modified = match fs::metadata(&path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff {
            let _ = fs::remove_file(&path);
        }
    }
}

pub async fn bind_listener(port: u16) -> io::Result<TcpListener> {
    // All interfaces, so field devices on the LAN can reach the service.
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_unparsable_value() {
        env::set_var("VITALS_COMMON_TEST_PORT", "not-a-port");
        assert_eq!(env_or("VITALS_COMMON_TEST_PORT", 3010u16), 3010);
        env::set_var("VITALS_COMMON_TEST_PORT", "8081");
        assert_eq!(env_or("VITALS_COMMON_TEST_PORT", 3010u16), 8081);
        env::remove_var("VITALS_COMMON_TEST_PORT");
    }

    #[test]
    fn env_opt_ignores_blank_values() {
        env::set_var("VITALS_COMMON_TEST_BLANK", "   ");
        assert_eq!(env_opt("VITALS_COMMON_TEST_BLANK"), None);
        env::set_var("VITALS_COMMON_TEST_BLANK", " secret ");
        assert_eq!(env_opt("VITALS_COMMON_TEST_BLANK").as_deref(), Some("secret"));
        env::remove_var("VITALS_COMMON_TEST_BLANK");
        assert_eq!(env_opt("VITALS_COMMON_TEST_MISSING"), None);
    }

    #[test]
    fn cleanup_removes_only_stale_files() {
        let root = env::temp_dir().join(format!("vitals-common-cleanup-{}", std::process::id()));
        let nested = root.join("nested");
        fs::create_dir_all(&nested).unwrap();
        let old = nested.join("old.log");
        fs::write(&old, b"old").unwrap();

        // Nothing is older than the epoch.
        cleanup_old_logs(&root, SystemTime::UNIX_EPOCH);
        assert!(old.exists());

        cleanup_old_logs(&root, SystemTime::now() + Duration::from_secs(60));
        assert!(!old.exists());

        let _ = fs::remove_dir_all(&root);
    }
}
