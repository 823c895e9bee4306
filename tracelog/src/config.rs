use std::path::PathBuf;

use trace_types::LogRequest;

use crate::format::{FormatOptions, DEFAULT_SHORT_ID_LEN};

#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file to rebuild the log from
    pub snapshot: Option<PathBuf>,
    /// Overrides the snapshot's selected node
    pub target_node: Option<String>,
    /// Overrides the snapshot's selected turn
    pub turn: Option<i64>,
    /// Characters kept when an identifier is shown truncated
    pub short_id_len: usize,
    /// Pretty-print structured payloads inside log lines
    pub pretty_payloads: bool,
}

impl Config {
    /// Read settings from the process environment, after merging in the
    /// nearest `.env` file (current directory or any ancestor).
    pub fn from_env() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }

        Ok(Self {
            snapshot: env_opt("TRACELOG_SNAPSHOT").map(PathBuf::from),
            target_node: env_opt("TRACELOG_TARGET_NODE"),
            turn: env_opt("TRACELOG_TURN")
                .map(|raw| {
                    raw.parse::<i64>().map_err(|e| {
                        anyhow::anyhow!("Failed to parse env var TRACELOG_TURN={raw}: {e}")
                    })
                })
                .transpose()?,
            short_id_len: env_parse("TRACELOG_SHORT_ID_LEN", DEFAULT_SHORT_ID_LEN)?,
            pretty_payloads: env_parse("TRACELOG_PRETTY_PAYLOADS", true)?,
        })
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            short_id_len: self.short_id_len,
            pretty_payloads: self.pretty_payloads,
        }
    }

    /// Apply the node/turn overrides on top of a loaded snapshot.
    pub fn apply(&self, request: &mut LogRequest) {
        if let Some(node) = &self.target_node {
            request.target_node_id = Some(node.clone());
        }
        if let Some(turn) = self.turn {
            request.turn = Some(turn);
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_uses_default_when_unset() {
        let value: usize = env_parse("TRACELOG_TEST_UNSET_KEY", 8).unwrap();
        assert_eq!(value, 8);
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("TRACELOG_TEST_BAD_BOOL", "sometimes");
        let err = env_parse::<bool>("TRACELOG_TEST_BAD_BOOL", true).unwrap_err();
        assert!(err.to_string().contains("TRACELOG_TEST_BAD_BOOL"));
        std::env::remove_var("TRACELOG_TEST_BAD_BOOL");
    }

    #[test]
    fn test_env_opt_ignores_blank_values() {
        std::env::set_var("TRACELOG_TEST_BLANK", "   ");
        assert_eq!(env_opt("TRACELOG_TEST_BLANK"), None);
        std::env::remove_var("TRACELOG_TEST_BLANK");
    }

    #[test]
    fn test_from_env_reads_overrides() {
        std::env::set_var("TRACELOG_TARGET_NODE", " N7 ");
        std::env::set_var("TRACELOG_SHORT_ID_LEN", "5");
        let config = Config::from_env().unwrap();
        std::env::remove_var("TRACELOG_TARGET_NODE");
        std::env::remove_var("TRACELOG_SHORT_ID_LEN");

        assert_eq!(config.target_node.as_deref(), Some("N7"));
        assert_eq!(config.short_id_len, 5);
    }

    #[test]
    fn test_format_options_follow_config() {
        let config = Config {
            snapshot: None,
            target_node: None,
            turn: None,
            short_id_len: 4,
            pretty_payloads: false,
        };
        let options = config.format_options();
        assert_eq!(options.short_id_len, 4);
        assert!(!options.pretty_payloads);
    }

    #[test]
    fn test_apply_overrides_request_selection() {
        let config = Config {
            snapshot: None,
            target_node: Some("N2".to_string()),
            turn: Some(3),
            short_id_len: DEFAULT_SHORT_ID_LEN,
            pretty_payloads: true,
        };
        let mut request = LogRequest {
            target_node_id: Some("N1".to_string()),
            ..Default::default()
        };
        config.apply(&mut request);
        assert_eq!(request.target_node_id.as_deref(), Some("N2"));
        assert_eq!(request.turn, Some(3));
    }

    #[test]
    fn test_apply_keeps_snapshot_values_without_overrides() {
        let config = Config {
            snapshot: None,
            target_node: None,
            turn: None,
            short_id_len: DEFAULT_SHORT_ID_LEN,
            pretty_payloads: true,
        };
        let mut request = LogRequest {
            target_node_id: Some("N1".to_string()),
            turn: Some(1),
            ..Default::default()
        };
        config.apply(&mut request);
        assert_eq!(request.target_node_id.as_deref(), Some("N1"));
        assert_eq!(request.turn, Some(1));
    }
}
