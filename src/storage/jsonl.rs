//! JSONL record files
//!
//! A store is one `.jsonl` file with one JSON object per line. Reads take
//! a shared lock; writes go to a temp file under an exclusive lock and are
//! renamed into place.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A file of JSON records, one per line
pub struct JsonlStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record, in file order
    pub fn read_all(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open store: {}", self.path.display()))?;

        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock on {}", self.path.display()))?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: T = serde_json::from_str(&line).with_context(|| {
                format!(
                    "Failed to parse record at {}:{}",
                    self.path.display(),
                    line_num + 1
                )
            })?;
            records.push(record);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Replaces the file contents with `records`
    pub fn write_all<'a>(&self, records: impl IntoIterator<Item = &'a T>) -> Result<usize>
    where
        T: 'a,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut count = 0;

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .with_context(|| format!("Failed to acquire write lock on {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);
            for record in records {
                let line = serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(writer, "{}", line).context("Failed to write record")?;
                count += 1;
            }

            writer.flush().context("Failed to flush store")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, Page, PageId, Versioned};
    use chrono::Utc;
    use tempfile::TempDir;

    fn make_record(title: &str, slug: &str) -> Versioned<Page> {
        let doc = Document::new(title, slug.parse().unwrap(), "<p>body</p>", "Alex M.");
        Versioned::new(Page::new(PageId::new(title, Utc::now()), doc))
    }

    #[test]
    fn read_missing_store() {
        let dir = TempDir::new().unwrap();
        let store: JsonlStore<Versioned<Page>> = JsonlStore::new(dir.path().join("pages.jsonl"));

        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn write_and_read_records() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::new(dir.path().join("pages.jsonl"));

        let records = vec![make_record("Careers", "/careers"), make_record("Contact Us", "/contact")];
        assert_eq!(store.write_all(&records).unwrap(), 2);

        let loaded: Vec<Versioned<Page>> = store.read_all().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::new(dir.path().join("pages.jsonl"));

        store.write_all(&[make_record("Careers", "/careers")]).unwrap();
        store.write_all(&Vec::<Versioned<Page>>::new()).unwrap();

        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn skips_blank_lines_and_reports_bad_ones() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.jsonl");
        let store: JsonlStore<Versioned<Page>> = JsonlStore::new(&path);

        let line = serde_json::to_string(&make_record("Careers", "/careers")).unwrap();
        fs::write(&path, format!("\n{}\n\n", line)).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);

        fs::write(&path, "{not json}\n").unwrap();
        let err = store.read_all().unwrap_err();
        assert!(format!("{:#}", err).contains("pages.jsonl:1"));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::new(dir.path().join("nested").join("dir").join("pages.jsonl"));

        store.write_all(&[make_record("Careers", "/careers")]).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::new(dir.path().join("pages.jsonl"));

        store.write_all(&[make_record("Careers", "/careers")]).unwrap();

        let temp_path = store.path().with_extension("jsonl.tmp");
        assert!(!temp_path.exists());
    }
}
