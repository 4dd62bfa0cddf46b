//! Assertion helpers that ride on the value machinery.

use std::fs;
use std::io;
use std::panic::Location;
use std::path::Path;

use crate::error::Error;
use crate::value::Value;

/// Compares a value against its stored snapshot.
///
/// The snapshot lives at `snapshots/<file>.<id>.snapshot` next to the
/// calling file. On first use the rendered value is written and the
/// comparison passes; afterwards the stored text must match exactly,
/// and a mismatch reports both the stored and the actual value. The
/// returned truthiness feeds a plain `assert!` like any other
/// condition.
#[track_caller]
pub fn snapshot(id: &str, value: impl Into<Value>) -> Result<bool, Error> {
    snapshot_at(Path::new(Location::caller().file()), id, &value.into())
}

fn snapshot_at(caller: &Path, id: &str, value: &Value) -> Result<bool, Error> {
    let stem = caller.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
        Error::Snapshot(format!(
            "cannot derive a snapshot name from '{}'",
            caller.display()
        ))
    })?;
    let dir = caller.parent().unwrap_or_else(|| Path::new("")).join("snapshots");
    let path = dir.join(format!("{stem}.{id}.snapshot"));
    let actual = value.render();

    match fs::read_to_string(&path) {
        Ok(stored) => {
            if stored == actual {
                Ok(true)
            } else {
                Err(Error::Snapshot(format!(
                    "'{id}' does not match the stored value\n  stored: {stored}\n  actual: {actual}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&dir)
                .and_then(|_| fs::write(&path, &actual))
                .map_err(|err| {
                    Error::Snapshot(format!("cannot write '{}': {err}", path.display()))
                })?;
            Ok(true)
        }
        Err(err) => Err(Error::Snapshot(format!(
            "cannot read '{}': {err}",
            path.display()
        ))),
    }
}
