use std::fs;

use scout_logging::{initialize, scout_debug, scout_info, LevelFilter, LogDestination};
use tempfile::TempDir;

#[test]
fn file_destination_receives_macro_output() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("scout.log");

    initialize(LogDestination::File(path.clone()), LevelFilter::Info);
    scout_info!("scrape {} started", 7);
    scout_debug!("filtered out below info");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("scrape 7 started"));
    assert!(!content.contains("filtered out below info"));
}
