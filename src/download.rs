//! CSV downloads for spreadsheet applications.
//!
//! Excel only detects UTF-8 in a CSV when the file starts with a byte-order
//! mark, so downloads carry one. File names are timestamped from the local
//! clock: `data_YYYYMMDD_HHMM.csv`.

use crate::error::Tab2TexError;
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &str = "\u{feff}";

/// `data_YYYYMMDD_HHMM.csv` for the given instant.
pub fn download_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("data_{}.csv", at.format("%Y%m%d_%H%M"))
}

/// File contents: BOM followed by the CSV text.
pub fn download_contents(csv: &str) -> String {
    let mut out = String::with_capacity(UTF8_BOM.len() + csv.len());
    out.push_str(UTF8_BOM);
    out.push_str(csv);
    out
}

/// Write `csv` into `dir` under a timestamped name, returning the path.
pub fn save_csv_download(dir: impl AsRef<Path>, csv: &str) -> Result<PathBuf, Tab2TexError> {
    let path = dir.as_ref().join(download_filename(&Local::now()));
    write_atomic(&path, download_contents(csv).as_bytes())?;
    info!("Saved CSV download to {}", path.display());
    Ok(path)
}

/// Write through a sibling temp file and rename, so readers never see a
/// partial file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Tab2TexError> {
    let write_failed = |e: std::io::Error| Tab2TexError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(write_failed)?;
    fs::rename(&tmp_path, path).map_err(write_failed)
}
