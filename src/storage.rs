//! Table files on disk.
//!
//! Every table of a database lives in its own `<table>.<ext>` file inside the
//! database directory. The first line is the comma-separated header, each
//! following line one row. Fields are split on every `,`: embedded commas
//! cannot be represented.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::StorageError;
use crate::table::{Row, Schema, Table};

const DELIMITER: char = ',';
const LOCK_FILE: &str = ".lock";

type Result<T> = std::result::Result<T, StorageError>;

/// Reads and writes the table files of one database directory.
///
/// No file handle outlives the call that opened it.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    extension: String,
}

impl Storage {
    /// Opens the database directory at `root`, creating it if absent.
    pub fn open(root: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
            debug!(path = %root.display(), "created database directory");
        }
        Ok(Self {
            root,
            extension: extension.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, self.extension))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table_path(name).is_file()
    }

    /// Creates the file of a new table holding only its header.
    ///
    /// Returns `Ok(false)` and leaves the existing file untouched if the
    /// table is already there.
    pub fn create_table(&self, name: &str, schema: &Schema) -> Result<bool> {
        let path = self.table_path(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let header = encode_line(&schema.columns);
        if let Err(e) = file.write_all(header.as_bytes()) {
            // Do not leave a file without a header behind.
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(StorageError::io(path, e));
        }
        debug!(table = name, path = %path.display(), "wrote table header");
        Ok(true)
    }

    /// Reads the header of a table, `None` if the table file does not exist.
    pub fn read_schema(&self, name: &str) -> Result<Option<Schema>> {
        let Some(reader) = self.open_reader(name)? else {
            return Ok(None);
        };
        let path = self.table_path(name);
        let header = reader
            .lines()
            .next()
            .transpose()
            .map_err(|e| StorageError::io(path, e))?
            .ok_or_else(|| StorageError::MissingHeader {
                table: name.to_string(),
            })?;
        Ok(Some(Schema::new(decode_line(&header))))
    }

    /// Reads a whole table, `None` if the table file does not exist.
    ///
    /// Blank lines are skipped; a row whose width disagrees with the header
    /// is reported as [StorageError::MalformedRow].
    pub fn load_table(&self, name: &str) -> Result<Option<Table>> {
        let Some(reader) = self.open_reader(name)? else {
            return Ok(None);
        };
        let path = self.table_path(name);
        let mut lines = reader.lines().enumerate();

        let header = match lines.next() {
            Some((_, line)) => line.map_err(|e| StorageError::io(&path, e))?,
            None => {
                return Err(StorageError::MissingHeader {
                    table: name.to_string(),
                });
            }
        };
        let mut table = Table::new(name.to_string(), Schema::new(decode_line(&header)));

        for (idx, line) in lines {
            let line = line.map_err(|e| StorageError::io(&path, e))?;
            if line.trim_end_matches('\r').is_empty() {
                continue;
            }
            table
                .insert(decode_line(&line))
                .map_err(|expected| StorageError::MalformedRow {
                    table: name.to_string(),
                    line: idx + 1,
                    expected,
                    found: line.split(DELIMITER).count(),
                })?;
        }

        debug!(table = name, rows = table.row_count(), "loaded table");
        Ok(Some(table))
    }

    /// Appends one row at the end of a table file.
    pub fn append_row(&self, name: &str, row: &Row) -> Result<()> {
        let path = self.table_path(name);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        file.write_all(encode_line(row).as_bytes())
            .map_err(|e| StorageError::io(&path, e))?;
        debug!(table = name, fields = row.len(), "appended row");
        Ok(())
    }

    /// Names of every table in the database, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut tables = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.root, e))?.path();
            let extension = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || extension != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tables.push(stem.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Takes the exclusive lock of this database directory, blocking until
    /// it is available. The lock is released when the guard is dropped.
    pub fn lock(&self) -> Result<StatementLock> {
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        file.lock_exclusive()
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(StatementLock { file })
    }

    fn open_reader(&self, name: &str) -> Result<Option<BufReader<File>>> {
        let path = self.table_path(name);
        match File::open(&path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

/// Exclusive hold on a database directory for one statement.
#[derive(Debug)]
pub struct StatementLock {
    file: File,
}

impl Drop for StatementLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn encode_line(fields: &[String]) -> String {
    let mut line = fields.join(",");
    line.push('\n');
    line
}

fn decode_line(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(DELIMITER)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn schema(columns: &[&str]) -> Schema {
        Schema::new(columns.iter().map(|c| c.to_string()).collect())
    }

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data").join("base");

        let storage = Storage::open(&root, "csv").unwrap();

        assert!(root.is_dir());
        assert_eq!(storage.root(), root.as_path());
    }

    #[test]
    fn test_create_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        assert!(storage.create_table("users", &schema(&["id", "name"])).unwrap());

        let content = fs::read_to_string(dir.path().join("users.csv")).unwrap();
        assert_eq!(content, "id,name\n");
        assert_eq!(
            storage.read_schema("users").unwrap(),
            Some(schema(&["id", "name"]))
        );
    }

    #[test]
    fn test_create_existing_table_is_untouched() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();
        storage.create_table("users", &schema(&["id"])).unwrap();

        assert!(!storage.create_table("users", &schema(&["other"])).unwrap());
        assert_eq!(storage.read_schema("users").unwrap(), Some(schema(&["id"])));
    }

    #[test]
    fn test_append_and_load() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();
        storage.create_table("users", &schema(&["id", "name"])).unwrap();

        storage.append_row("users", &row(&["1", "'alice'"])).unwrap();
        storage.append_row("users", &row(&["2", "bob"])).unwrap();

        let table = storage.load_table("users").unwrap().unwrap();
        assert_eq!(table.schema, schema(&["id", "name"]));
        assert_eq!(table.rows, vec![row(&["1", "'alice'"]), row(&["2", "bob"])]);
    }

    #[test]
    fn test_missing_table_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        assert!(!storage.exists("ghost"));
        assert_eq!(storage.read_schema("ghost").unwrap(), None);
        assert_eq!(storage.load_table("ghost").unwrap(), None);
    }

    #[test]
    fn test_load_skips_blank_lines_and_carriage_returns() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.csv"), "a,b\r\n1,2\r\n\n3,4\n").unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        let table = storage.load_table("t").unwrap().unwrap();
        assert_eq!(table.schema, schema(&["a", "b"]));
        assert_eq!(table.rows, vec![row(&["1", "2"]), row(&["3", "4"])]);
    }

    #[test]
    fn test_load_reports_malformed_row() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.csv"), "a,b\n1,2\n1,2,3\n").unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        let err = storage.load_table("t").unwrap_err();
        assert!(matches!(
            err,
            StorageError::MalformedRow {
                line: 2,
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.csv"), "").unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        assert!(matches!(
            storage.read_schema("t"),
            Err(StorageError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_list_tables_filters_extension() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();
        storage.create_table("users", &schema(&["id"])).unwrap();
        storage.create_table("orders", &schema(&["id"])).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let _lock = storage.lock().unwrap();

        assert_eq!(storage.list_tables().unwrap(), vec!["orders", "users"]);
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path(), "csv").unwrap();

        drop(storage.lock().unwrap());
        // Would block forever if the first guard had leaked its lock.
        drop(storage.lock().unwrap());
    }

    #[test]
    fn test_lock_serializes_handles_on_one_directory() {
        let dir = TempDir::new().unwrap();
        let first = Storage::open(dir.path(), "csv").unwrap();
        let second = first.clone();

        let guard = first.lock().unwrap();
        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let _lock = second.lock().unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        waiter.join().unwrap();
    }
}
