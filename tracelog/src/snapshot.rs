//! Loading of input snapshots written by the viewer's data layer.

use std::path::Path;

use trace_types::LogRequest;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON snapshot (the `LogRequest` shape) from `path`.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<LogRequest, SnapshotError> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: shown.clone(),
        source,
    })?;
    let request: LogRequest =
        serde_json::from_str(&raw).map_err(|source| SnapshotError::Parse {
            path: shown.clone(),
            source,
        })?;

    tracing::info!(
        path = %shown,
        trace_events = request.trace_stream.len(),
        run_log_records = request.run_log_buffer.len(),
        nodes = request.node_descriptors.len(),
        has_node_local_log = request.node_local_log.is_some(),
        "Loaded snapshot"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_snapshot_reads_request() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "targetNodeId": "N1",
                "traceStream": [{{"nodeId": "N1", "nodeType": "condition", "turn": 1}}],
                "generatedAt": "2026-01-01T00:00:00Z"
            }}"#
        )
        .unwrap();

        let request = load_snapshot(file.path()).unwrap();
        assert_eq!(request.target_node_id.as_deref(), Some("N1"));
        assert_eq!(request.trace_stream.len(), 1);
        assert_eq!(request.generated_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_load_snapshot_accepts_null_collections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"traceStream": null, "runLogBuffer": null, "nodes": null, "nodeLocalLog": null}}"#
        )
        .unwrap();

        let request = load_snapshot(file.path()).unwrap();
        assert!(request.trace_stream.is_empty());
        assert!(request.run_log_buffer.is_empty());
        assert!(request.node_descriptors.is_empty());
        assert!(request.node_local_log.is_none());
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_load_snapshot_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_snapshot(file.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
    }
}
