use anyhow::Context;
use tracelog::config::Config;
use tracelog::snapshot::load_snapshot;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // stdout carries the JSON output only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    let path = std::env::args_os()
        .nth(1)
        .map(std::path::PathBuf::from)
        .or_else(|| config.snapshot.clone())
        .context("usage: tracelog <snapshot.json> (or set TRACELOG_SNAPSHOT)")?;

    let mut request = load_snapshot(&path)?;
    config.apply(&mut request);
    if request.generated_at.is_empty() {
        request.generated_at = chrono::Local::now().format("%H:%M:%S").to_string();
    }

    let run_log = tracelog::build_run_log(&request, &config.format_options());
    tracing::info!(
        source = %run_log.source,
        entries = run_log.entries.len(),
        "Reconstructed log"
    );

    println!("{}", serde_json::to_string_pretty(&run_log)?);
    Ok(())
}
