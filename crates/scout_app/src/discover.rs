//! One-shot global keyword search that writes a CSV of candidate channels.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use scout_engine::{run_discovery, ClientFactory, DiscoveryReport, DiscoverySettings, ScoutConfig};
use scout_logging::{scout_info, scout_warn};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REPORT_FILE: &str = "discovered_channels_report.csv";

/// Keywords from the command line followed by those in `file`, one per line.
pub fn collect_keywords(inline: &[String], file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut keywords: Vec<String> = inline.to_vec();
    if let Some(path) = file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read keywords file {path:?}"))?;
        keywords.extend(scout_core::parse_lines(&raw));
    }
    keywords.retain(|keyword| !keyword.trim().is_empty());
    Ok(keywords)
}

/// Runs discovery and writes the report. Returns the report path, if one was written.
pub async fn run(
    factory: &dyn ClientFactory,
    config: &ScoutConfig,
    settings: &DiscoverySettings,
    output: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<Option<PathBuf>> {
    if settings.keywords.is_empty() {
        bail!("no keywords given; use --keyword or --keywords-file");
    }
    scout_info!("Starting the channel discovery assistant...");

    let outcome = run_discovery(factory, config, settings, cancel).await?;
    if outcome.failed_keywords > 0 {
        scout_warn!("{} keyword(s) could not be searched", outcome.failed_keywords);
    }
    if outcome.records.is_empty() {
        scout_info!("No messages were found matching your criteria.");
        return Ok(None);
    }

    scout_info!("Discovered {} unique channels.", outcome.channels.len());
    scout_info!("Found a total of {} relevant messages.", outcome.records.len());
    let report = DiscoveryReport::new(outcome.records);
    let written = report
        .write(output)
        .with_context(|| format!("could not save report to {output:?}"))?;
    scout_info!("Successfully saved report to {written:?}");

    println!("--- Unique Channels Discovered ---");
    for username in &outcome.channels {
        println!("@{username}");
    }
    Ok(Some(written))
}
