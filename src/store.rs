use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::parser::ParsedTable;
use crate::schema::HeaderSet;

/// One data row: ordered field values keyed by header name, plus its selection flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
    pub selected: bool,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a field, replacing the value if the name already exists.
    pub fn set(&mut self, name: &str, value: String) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Builder-style variant of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Exact lookup first, then an ASCII case-insensitive one.
    pub fn get_loose(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

struct FieldMap<'a>(&'a [(String, String)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 2)?;
        state.serialize_field("selected", &self.selected)?;
        state.serialize_field("fields", &FieldMap(&self.fields))?;
        state.end()
    }
}

/// An ingested file and the records parsed from it.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Local>,
    pub selected: bool,
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl SourceFile {
    /// Wrap a parsed table; the file starts out unselected.
    pub fn new<S: Into<String>>(name: S, size: u64, table: ParsedTable) -> Self {
        Self {
            name: name.into(),
            size,
            uploaded_at: Local::now(),
            selected: false,
            headers: table.headers,
            records: table.rows,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("file \"{name}\" does not match the columns of the first file ({expected})")]
    SchemaMismatch { name: String, expected: String },
    #[error("file index {index} out of range 0..{len}")]
    FileIndex { index: usize, len: usize },
    #[error("row index {index} out of range 0..{len} in file \"{name}\"")]
    RowIndex {
        index: usize,
        len: usize,
        name: String,
    },
}

/// Owns every accepted file together with the reference header set.
#[derive(Debug, Default)]
pub struct RecordStore {
    files: Vec<SourceFile>,
    headers: HeaderSet,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference header row shared by every stored file.
    pub fn headers(&self) -> &[String] {
        self.headers.names()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Reconcile the file's headers and store it; returns the new file index.
    pub fn add_file(&mut self, file: SourceFile) -> Result<usize, StoreError> {
        if !self.headers.reconcile(&file.headers) {
            return Err(StoreError::SchemaMismatch {
                name: file.name,
                expected: self.headers.names().join(", "),
            });
        }
        self.files.push(file);
        Ok(self.files.len() - 1)
    }

    /// Evict a file. Removing the last one clears the reference headers.
    pub fn remove_file(&mut self, index: usize) -> Result<SourceFile, StoreError> {
        self.check_file(index)?;
        let removed = self.files.remove(index);
        if self.files.is_empty() {
            self.headers.reset();
        }
        Ok(removed)
    }

    pub fn toggle_file_selection(&mut self, index: usize) -> Result<bool, StoreError> {
        self.check_file(index)?;
        let file = &mut self.files[index];
        file.selected = !file.selected;
        Ok(file.selected)
    }

    pub fn set_file_selected(&mut self, index: usize, flag: bool) -> Result<(), StoreError> {
        self.check_file(index)?;
        self.files[index].selected = flag;
        Ok(())
    }

    /// Whether any file is selected, i.e. there is a table to show.
    pub fn show_table(&self) -> bool {
        self.files.iter().any(|f| f.selected)
    }

    pub fn set_record_selected(
        &mut self,
        file: usize,
        row: usize,
        flag: bool,
    ) -> Result<(), StoreError> {
        self.record_mut(file, row)?.selected = flag;
        Ok(())
    }

    pub fn toggle_record(&mut self, file: usize, row: usize) -> Result<bool, StoreError> {
        let record = self.record_mut(file, row)?;
        record.selected = !record.selected;
        Ok(record.selected)
    }

    /// Set the flag on every record of every file, selected or not.
    pub fn set_all_selected(&mut self, flag: bool) {
        for record in self.files.iter_mut().flat_map(|f| f.records.iter_mut()) {
            record.selected = flag;
        }
    }

    /// True when the table of selected files is non-empty and fully checked.
    pub fn is_all_selected(&self) -> bool {
        let mut rows = self.table_rows().peekable();
        rows.peek().is_some() && rows.all(|(_, _, record)| record.selected)
    }

    /// Rows of the selected files in display order, tagged with their file and row index.
    pub fn table_rows(&self) -> impl Iterator<Item = (usize, usize, &Record)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.selected)
            .flat_map(|(fi, f)| f.records.iter().enumerate().map(move |(ri, r)| (fi, ri, r)))
    }

    /// Checked records of selected files, in file order then row order.
    pub fn selected_subset(&self) -> Vec<&Record> {
        self.table_rows()
            .filter(|(_, _, record)| record.selected)
            .map(|(_, _, record)| record)
            .collect()
    }

    fn check_file(&self, index: usize) -> Result<(), StoreError> {
        if index >= self.files.len() {
            return Err(StoreError::FileIndex {
                index,
                len: self.files.len(),
            });
        }
        Ok(())
    }

    fn record_mut(&mut self, file: usize, row: usize) -> Result<&mut Record, StoreError> {
        self.check_file(file)?;
        let entry = &mut self.files[file];
        let len = entry.records.len();
        entry.records.get_mut(row).ok_or_else(|| StoreError::RowIndex {
            index: row,
            len,
            name: entry.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn file(name: &str, text: &str) -> SourceFile {
        SourceFile::new(name, text.len() as u64, parse(text))
    }

    fn store_with_two_files() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .add_file(file("a.csv", "name,year\nA1,1900\nA2,1901\n"))
            .unwrap();
        store
            .add_file(file("b.csv", "year,name\n1950,B1\n"))
            .unwrap();
        store
    }

    fn subset_names(store: &RecordStore) -> Vec<String> {
        store
            .selected_subset()
            .iter()
            .map(|r| r.get("name").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn record_set_replaces_existing_field() {
        let record = Record::new().with("a", "1").with("b", "2").with("a", "3");
        assert_eq!(record.values().collect::<Vec<_>>(), vec!["3", "2"]);
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn loose_lookup_ignores_case() {
        let record = Record::new().with("Year", "1921");
        assert_eq!(record.get("year"), None);
        assert_eq!(record.get_loose("year"), Some("1921"));
    }

    #[test]
    fn record_serializes_fields_as_map() {
        let record = Record::new().with("name", "Eagle");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"selected":false,"fields":{"name":"Eagle"}}"#);
    }

    #[test]
    fn mismatched_file_is_rejected() {
        let mut store = store_with_two_files();
        let err = store.add_file(file("c.csv", "name\nC1\n")).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { ref name, .. } if name == "c.csv"));
        assert_eq!(store.files().len(), 2);
    }

    #[test]
    fn subset_requires_file_and_row_selection() {
        let mut store = store_with_two_files();
        store.set_all_selected(true);
        assert!(subset_names(&store).is_empty());

        store.toggle_file_selection(1).unwrap();
        assert_eq!(subset_names(&store), vec!["B1"]);

        store.toggle_file_selection(0).unwrap();
        store.set_record_selected(0, 0, false).unwrap();
        assert_eq!(subset_names(&store), vec!["A2", "B1"]);
    }

    #[test]
    fn subset_follows_insertion_then_row_order() {
        let mut store = store_with_two_files();
        store.set_file_selected(1, true).unwrap();
        store.set_file_selected(0, true).unwrap();
        store.set_all_selected(true);
        assert_eq!(subset_names(&store), vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn set_all_touches_unselected_files() {
        let mut store = store_with_two_files();
        store.set_all_selected(true);
        assert!(store.files().iter().flat_map(|f| &f.records).all(|r| r.selected));
    }

    #[test]
    fn all_selected_aggregate() {
        let mut store = store_with_two_files();
        store.set_all_selected(true);
        // nothing visible yet
        assert!(!store.is_all_selected());

        store.toggle_file_selection(0).unwrap();
        assert!(store.is_all_selected());

        store.toggle_record(0, 1).unwrap();
        assert!(!store.is_all_selected());
    }

    #[test]
    fn set_all_is_idempotent() {
        let mut store = store_with_two_files();
        store.set_file_selected(0, true).unwrap();
        store.set_all_selected(true);
        let first = subset_names(&store);
        store.set_all_selected(true);
        assert_eq!(subset_names(&store), first);
        assert!(store.is_all_selected());
    }

    #[test]
    fn removing_last_file_resets_schema() {
        let mut store = store_with_two_files();
        store.remove_file(0).unwrap();
        assert_eq!(store.headers().len(), 2);
        store.remove_file(0).unwrap();
        assert!(store.headers().is_empty());
        assert!(store.add_file(file("c.csv", "sku\n1\n")).is_ok());
        assert_eq!(store.headers(), ["sku".to_string()].as_slice());
    }

    #[test]
    fn show_table_tracks_file_selection() {
        let mut store = store_with_two_files();
        assert!(!store.show_table());
        store.toggle_file_selection(1).unwrap();
        assert!(store.show_table());
        store.remove_file(1).unwrap();
        assert!(!store.show_table());
    }

    #[test]
    fn out_of_range_indices_are_errors() {
        let mut store = store_with_two_files();
        assert_eq!(
            store.remove_file(5).unwrap_err(),
            StoreError::FileIndex { index: 5, len: 2 }
        );
        assert!(matches!(
            store.toggle_record(1, 9),
            Err(StoreError::RowIndex { index: 9, len: 1, .. })
        ));
    }
}
