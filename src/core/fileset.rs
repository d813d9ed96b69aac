//! Purpose: Model the three on-disk SQLite files owned by a symco server.
//! Exports: `DB_FILE_NAME`, `WAL_SUFFIX`, `SHM_SUFFIX`, `FileRole`, `DbFile`, `DbFileSet`, `FileStatus`.
//! Role: Single source of path derivation and inspection for CLI and tests.
//! Invariants: Companion file names are always derived from `DB_FILE_NAME` plus a suffix.
//! Invariants: Set order is fixed: database, write-ahead log, shared-memory index.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::error::{Error, map_io_error_kind};

pub const DB_FILE_NAME: &str = "symco.db";
pub const WAL_SUFFIX: &str = "-wal";
pub const SHM_SUFFIX: &str = "-shm";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileRole {
    Database,
    WriteAheadLog,
    SharedMemory,
}

impl FileRole {
    pub fn file_name(self) -> String {
        match self {
            FileRole::Database => DB_FILE_NAME.to_string(),
            FileRole::WriteAheadLog => format!("{DB_FILE_NAME}{WAL_SUFFIX}"),
            FileRole::SharedMemory => format!("{DB_FILE_NAME}{SHM_SUFFIX}"),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FileRole::Database => "database",
            FileRole::WriteAheadLog => "wal",
            FileRole::SharedMemory => "shm",
        }
    }

    // The shared-memory file is transient coordination state; the report
    // shows presence only, never a size.
    pub fn reports_size(self) -> bool {
        !matches!(self, FileRole::SharedMemory)
    }
}

#[derive(Clone, Debug)]
pub struct DbFile {
    pub role: FileRole,
    pub name: String,
    pub path: PathBuf,
}

impl DbFile {
    fn at(role: FileRole, base_dir: &Path) -> Self {
        let name = role.file_name();
        let path = base_dir.join(&name);
        Self { role, name, path }
    }

    pub fn status(&self) -> Result<FileStatus, Error> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(FileStatus::Present {
                size_bytes: meta.len(),
                modified: meta.modified().ok(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileStatus::Absent),
            Err(err) => Err(Error::new(map_io_error_kind(&err))
                .with_message("failed to stat database file")
                .with_path(&self.path)
                .with_source(err)),
        }
    }
}

#[derive(Debug)]
pub struct DbFileSet {
    files: [DbFile; 3],
}

impl DbFileSet {
    pub fn at(base_dir: &Path) -> Self {
        Self {
            files: [
                DbFile::at(FileRole::Database, base_dir),
                DbFile::at(FileRole::WriteAheadLog, base_dir),
                DbFile::at(FileRole::SharedMemory, base_dir),
            ],
        }
    }

    pub fn files(&self) -> &[DbFile] {
        &self.files
    }
}

#[derive(Clone, Copy, Debug)]
pub enum FileStatus {
    Present {
        size_bytes: u64,
        modified: Option<SystemTime>,
    },
    Absent,
}

impl FileStatus {
    pub fn is_present(self) -> bool {
        matches!(self, FileStatus::Present { .. })
    }
}
