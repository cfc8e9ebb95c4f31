//! File-backed once-per-day gate: the file holds the last completed date.

use crate::domain::error::TacticianError;
use crate::ports::gate_port::RunGate;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct FileRunMarker {
    path: PathBuf,
}

impl FileRunMarker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn last_run(&self) -> Result<Option<NaiveDate>, TacticianError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        NaiveDate::parse_from_str(content.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|e| TacticianError::Data {
                reason: format!("corrupt run marker {}: {e}", self.path.display()),
            })
    }
}

impl RunGate for FileRunMarker {
    fn already_ran(&self, date: NaiveDate) -> Result<bool, TacticianError> {
        Ok(self.last_run()? == Some(date))
    }

    fn mark_done(&mut self, date: NaiveDate) -> Result<(), TacticianError> {
        fs::write(&self.path, format!("{}\n", date.format("%Y-%m-%d")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn fresh_marker_has_not_run() {
        let dir = TempDir::new().unwrap();
        let marker = FileRunMarker::new(dir.path().join("last_run"));
        assert!(!marker.already_ran(d(1)).unwrap());
    }

    #[test]
    fn mark_done_blocks_same_day_only() {
        let dir = TempDir::new().unwrap();
        let mut marker = FileRunMarker::new(dir.path().join("last_run"));
        marker.mark_done(d(4)).unwrap();
        assert!(marker.already_ran(d(4)).unwrap());
        assert!(!marker.already_ran(d(5)).unwrap());
    }

    #[test]
    fn corrupt_marker_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_run");
        fs::write(&path, "yesterday").unwrap();
        let marker = FileRunMarker::new(path);
        assert!(marker.already_ran(d(1)).is_err());
    }
}
