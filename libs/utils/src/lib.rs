pub mod signal;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `directives`.
pub fn set_log(directives: String) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .try_init();
}

/// Filter directives for every crate of the workspace at one level
pub fn log_directives(level: &str) -> String {
    ["livepod", "livecast", "http_log", "storage", "auth", "utils"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .chain(["sea_orm=warn".to_string(), "sqlx=warn".to_string()])
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives() {
        let directives = log_directives("debug");
        assert!(directives.starts_with("livepod=debug,livecast=debug"));
        assert!(directives.ends_with("sea_orm=warn,sqlx=warn"));
    }
}
