use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FileError + '_ {
    move |source| FileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

type LockMap = HashMap<PathBuf, Arc<Mutex<()>>>;

fn locks() -> MutexGuard<'static, LockMap> {
    static LOCKS: OnceLock<Mutex<LockMap>> = OnceLock::new();
    LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One lock per path, shared by every caller in the process.
///
/// Entries nobody holds or waits on are dropped on each call, so the map only
/// keeps paths with an operation in flight.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = locks();
    // Clones are only handed out under the map lock, so a count of 1 is idle
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(lock_key(path)).or_default())
}

/// The file may not exist yet, so only the directory part is canonicalized.
fn lock_key(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create or truncate `path` and write `data` followed by a newline.
pub fn create(path: impl AsRef<Path>, data: &str) -> Result<(), FileError> {
    let path = path.as_ref();
    let lock = path_lock(path);
    let _guard = hold(&lock);

    let mut file = File::create(path).map_err(io_error(path))?;
    writeln!(file, "{}", data).map_err(io_error(path))
}

/// Append `line` and a newline, creating the file if needed.
pub fn append_line(path: impl AsRef<Path>, line: &str) -> Result<(), FileError> {
    let path = path.as_ref();
    let lock = path_lock(path);
    let _guard = hold(&lock);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;
    writeln!(file, "{}", line).map_err(io_error(path))
}

/// Read the whole file as UTF-8. Waits for any in-flight write on the same path.
pub fn read(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    let lock = path_lock(path);
    let _guard = hold(&lock);

    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(io_error(path))?;
    Ok(contents)
}
