//! Sequential ingestion of delimited files into a [`RecordStore`].
//!
//! Files are read, parsed and stored one at a time so that the first accepted
//! file always establishes the reference columns for the ones after it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::parse;
use crate::store::{RecordStore, SourceFile, StoreError};

/// File name suffix every ingested file must carry.
pub const FILE_SUFFIX: &str = ".csv";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("please select only CSV files (rejected: {})", names.join(", "))]
    InvalidFileType { names: Vec<String> },
    #[error(
        "file \"{name}\" format does not match the first file; all files must have the same columns"
    )]
    SchemaMismatch { name: String },
    #[error("failed to read \"{name}\": {source}")]
    UnreadableContent {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Anything that can hand over a named blob of file content.
pub trait FileSource {
    fn name(&self) -> &str;
    fn read(&self) -> io::Result<Vec<u8>>;
}

/// A file on disk; its name is the final path component.
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    name: String,
}

impl PathSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

impl FileSource for PathSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// In-memory content, e.g. bytes handed over by an upload widget.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new<S: Into<String>, B: Into<Vec<u8>>>(name: S, bytes: B) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl FileSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Outcome of one ingestion call: indices of stored files plus per-file warnings.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<usize>,
    pub warnings: Vec<IngestError>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn has_valid_suffix(name: &str) -> bool {
    name.ends_with(FILE_SUFFIX)
}

/// Ingest a selection of files.
///
/// A selection containing any name without the `.csv` suffix is rejected as a
/// whole before anything is read. Otherwise each file is processed in order;
/// unreadable or mismatching files are reported and skipped without touching
/// files stored earlier.
pub fn ingest<S: FileSource>(
    store: &mut RecordStore,
    sources: &[S],
) -> Result<IngestReport, IngestError> {
    let invalid: Vec<String> = sources
        .iter()
        .map(|s| s.name())
        .filter(|name| !has_valid_suffix(name))
        .map(str::to_string)
        .collect();
    if !invalid.is_empty() {
        return Err(IngestError::InvalidFileType { names: invalid });
    }

    let mut report = IngestReport::default();
    for source in sources {
        match ingest_one(store, source) {
            Ok(index) => report.accepted.push(index),
            Err(err) => {
                warn!(file = source.name(), "{}", err);
                report.warnings.push(err);
            }
        }
    }
    info!(
        accepted = report.accepted.len(),
        skipped = report.warnings.len(),
        "ingestion finished"
    );
    Ok(report)
}

fn ingest_one<S: FileSource>(store: &mut RecordStore, source: &S) -> Result<usize, IngestError> {
    let name = source.name().to_string();
    let bytes = source
        .read()
        .map_err(|err| IngestError::UnreadableContent {
            name: name.clone(),
            source: err,
        })?;
    let text = String::from_utf8_lossy(&bytes);
    let table = parse(&text);
    debug!(
        file = %name,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "parsed file"
    );

    let file = SourceFile::new(name, bytes.len() as u64, table);
    store.add_file(file).map_err(|err| match err {
        StoreError::SchemaMismatch { name, .. } => IngestError::SchemaMismatch { name },
        other => IngestError::Store(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl FileSource for Broken {
        fn name(&self) -> &str {
            "broken.csv"
        }

        fn read(&self) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn invalid_suffix_rejects_whole_selection() {
        let mut store = RecordStore::new();
        let sources = vec![
            MemorySource::new("good.csv", "a\n1\n"),
            MemorySource::new("notes.txt", "a\n1\n"),
        ];
        let err = ingest(&mut store, &sources).unwrap_err();
        assert!(matches!(err, IngestError::InvalidFileType { ref names } if names == &["notes.txt"]));
        assert!(store.is_empty());
    }

    #[test]
    fn suffix_check_is_case_sensitive() {
        assert!(has_valid_suffix("coins.csv"));
        assert!(!has_valid_suffix("coins.CSV"));
        assert!(!has_valid_suffix("coins.csv.bak"));
    }

    #[test]
    fn mismatch_skips_only_that_file() {
        let mut store = RecordStore::new();
        let sources = vec![
            MemorySource::new("a.csv", "name,year\nA,1900\n"),
            MemorySource::new("b.csv", "name\nB\n"),
            MemorySource::new("c.csv", "year,name\n1950,C\n"),
        ];
        let report = ingest(&mut store, &sources).unwrap();
        assert_eq!(report.accepted, vec![0, 1]);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(&report.warnings[0], IngestError::SchemaMismatch { name } if name == "b.csv"));
        assert_eq!(store.files().len(), 2);
    }

    #[test]
    fn unreadable_file_does_not_disturb_earlier_files() {
        let mut store = RecordStore::new();
        ingest(&mut store, &[MemorySource::new("a.csv", "name\nA\n")]).unwrap();
        let report = ingest(&mut store, &[Broken]).unwrap();
        assert!(report.accepted.is_empty());
        assert!(matches!(report.warnings[0], IngestError::UnreadableContent { .. }));
        assert_eq!(store.files().len(), 1);
        assert_eq!(store.files()[0].records.len(), 1);
    }

    #[test]
    fn empty_file_fails_against_existing_reference() {
        let mut store = RecordStore::new();
        let sources = vec![
            MemorySource::new("a.csv", "name\nA\n"),
            MemorySource::new("empty.csv", "\n\n"),
        ];
        let report = ingest(&mut store, &sources).unwrap();
        assert_eq!(report.accepted, vec![0]);
        assert!(matches!(report.warnings[0], IngestError::SchemaMismatch { .. }));
    }

    #[test]
    fn file_size_is_byte_length() {
        let mut store = RecordStore::new();
        ingest(&mut store, &[MemorySource::new("a.csv", "name\nÄ\n")]).unwrap();
        assert_eq!(store.files()[0].size, 8);
        assert!(!store.files()[0].selected);
    }
}
