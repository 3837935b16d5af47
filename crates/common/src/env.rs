//! Environment/runtime helpers
//!
//! Sanity checks run once at startup before the HTTP server binds.

use tracing::debug;

/// Ensure the log directory exists.
pub async fn ensure_env(log_dir: &str) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(log_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {log_dir}: {e}"))?;
    debug!(log_dir, "log directory ready");
    Ok(())
}

/// Read an env var and parse it, ignoring blanks and parse failures.
pub fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::{ensure_env, parse_var};

    #[tokio::test]
    async fn ensure_env_creates_nested_log_dir() {
        let dir = std::env::temp_dir().join(format!("chocomap-env-{}", std::process::id())).join("logs");
        let path = dir.to_string_lossy().to_string();
        ensure_env(&path).await.unwrap();
        assert!(dir.is_dir());
        // second call is a no-op
        ensure_env(&path).await.unwrap();
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn parse_var_ignores_garbage() {
        std::env::set_var("CHOCOMAP_TEST_PARSE_VAR", "not-a-number");
        assert_eq!(parse_var::<u16>("CHOCOMAP_TEST_PARSE_VAR"), None);
        std::env::set_var("CHOCOMAP_TEST_PARSE_VAR", " 8080 ");
        assert_eq!(parse_var::<u16>("CHOCOMAP_TEST_PARSE_VAR"), Some(8080));
        std::env::remove_var("CHOCOMAP_TEST_PARSE_VAR");
    }
}
