//! Comment-preserving edits of the config file.
//!
//! Edits go through `toml_edit` so user comments and ordering survive, and the
//! result replaces the file atomically (temp file in the same directory, then
//! rename). The file may hold API keys, so it is kept owner-only on Unix.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use toml_edit::{DocumentMut, Item, Table};

/// Write `bytes` to `path` via temp file + rename, with mode 0o600 on Unix.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Create the config directory, tightening it to 0o700 when we own it.
fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};
        let metadata = fs::metadata(parent)?;
        // SAFETY: getuid has no preconditions and cannot fail.
        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() == our_uid && metadata.permissions().mode() & 0o077 != 0 {
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

/// Load `path` (or an empty document), apply `edit`, write it back atomically.
pub(crate) fn edit_document(path: &Path, edit: impl FnOnce(&mut DocumentMut)) -> io::Result<()> {
    ensure_parent_dir(path)?;

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };
    let mut doc = content
        .parse::<DocumentMut>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    edit(&mut doc);

    atomic_write(path, doc.to_string().as_bytes())
}

/// `doc[table]`, created as a standard table when absent or not a table.
pub(crate) fn table_mut<'a>(doc: &'a mut DocumentMut, table: &str) -> &'a mut Table {
    if !doc.get(table).is_some_and(Item::is_table) {
        doc[table] = Item::Table(Table::new());
    }
    // Guaranteed a table by the branch above.
    doc[table]
        .as_table_mut()
        .unwrap_or_else(|| unreachable!("[{table}] was just inserted"))
}
