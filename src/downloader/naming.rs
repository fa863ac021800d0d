//! Destination naming: `<save_root>/<YYYYMMDD>/<rank:08> <title>[ <page>]<suffix>`

use chrono::NaiveDate;

use crate::types::DownloadTask;

/// Per-day folder name
pub fn folder_name(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// File name for a task. Zero-padded rank keeps lexical order equal to rank order.
pub fn file_name(task: &DownloadTask) -> String {
    let mut name = format!("{:08} {}", task.rank(), sanitize_title(task.title()));
    if let Some(page) = task.page_index() {
        name.push(' ');
        name.push_str(&page.to_string());
    }
    name.push_str(task.suffix());
    name
}

/// Replace characters that would escape or break the day folder
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
