//! File helpers shared by the snapshot code and the directory pager

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Result, VmError};

/// Read a whole file, or `None` if it does not exist
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(blob) => Ok(Some(blob)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place
///
/// The target either keeps its old contents or holds all of `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| VmError::Io(format!("not a file path: {}", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
