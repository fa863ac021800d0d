//! Downloader tests: per-task procedure and full pipeline runs against [`MockGallery`].

use super::test_helpers::{MockGallery, create_test_downloader, date, test_config, work};
use super::*;
use crate::error::Error;
use crate::types::{DownloadTask, SkipReason, TaskOutcome};
use std::path::Path;
use std::time::Duration;


fn range(start: chrono::NaiveDate, end: chrono::NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
