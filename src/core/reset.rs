//! Purpose: Delete the symco database file set, best effort and in fixed order.
//! Exports: `delete_file`, `reset_files`, `ResetOutcome`.
//! Role: Mutation layer under the CLI; all reporting stays with the caller.
//! Invariants: Deletion order follows `DbFileSet` order (database, WAL, shared-memory).
//! Invariants: One file's failure never prevents attempts on the remaining files.

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind, map_io_error_kind};
use crate::core::fileset::{DbFile, DbFileSet};

#[derive(Debug, Default)]
pub struct ResetOutcome {
    pub deleted: Vec<DbFile>,
    pub failed: Vec<(DbFile, Error)>,
}

impl ResetOutcome {
    pub fn first_error_kind(&self) -> Option<ErrorKind> {
        self.failed.first().map(|(_, err)| err.kind())
    }
}

pub fn delete_file(file: &DbFile) -> Result<bool, Error> {
    match std::fs::remove_file(&file.path) {
        Ok(()) => Ok(true),
        // Lost a race with another cleanup; already gone counts as done.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::new(map_io_error_kind(&err))
            .with_message("failed to delete database file")
            .with_path(&file.path)
            .with_source(err)),
    }
}

pub fn reset_files(set: &DbFileSet) -> ResetOutcome {
    let mut outcome = ResetOutcome::default();
    for file in set.files() {
        if !file.path.exists() {
            debug!(file = %file.path.display(), "skipping absent file");
            continue;
        }
        match delete_file(file) {
            Ok(true) => {
                debug!(file = %file.path.display(), "deleted file");
                outcome.deleted.push(file.clone());
            }
            Ok(false) => {
                debug!(file = %file.path.display(), "file vanished before delete");
            }
            Err(err) => {
                warn!(file = %file.path.display(), error = %err, "delete failed");
                outcome.failed.push((file.clone(), err));
            }
        }
    }
    outcome
}
