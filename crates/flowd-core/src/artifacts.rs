//! Run artifact directory/file permissions: a 0700 run directory,
//! 0600 files inside it (spec.md run artifact layout).

use std::fs::{self, File};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Creates `run_dir` (and any missing parents) and secures it to 0700.
pub fn create_run_dir(run_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(run_dir)?;
    secure_dir(run_dir)
}

#[cfg(unix)]
fn secure_dir(dir: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(dir)?.permissions();
    perms.set_mode(0o700);
    fs::set_permissions(dir, perms)
}

#[cfg(not(unix))]
fn secure_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn secure_file(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn secure_file(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Writes `contents` to `path` in one shot and secures it to 0600 —
/// for `plan.json`.
pub fn write_secure_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)?;
    secure_file(path)
}

/// Creates `path` for incremental writing and secures it to 0600 — for
/// the raw `stdout`/`stderr` files a `RawOutputSink` appends to as a run
/// progresses.
pub fn create_secure_file(path: &Path) -> io::Result<File> {
    let file = File::create(path)?;
    secure_file(path)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn run_dir_is_secured_to_0700() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("runs").join("run-1");
        create_run_dir(&run_dir).unwrap();
        let mode = fs::metadata(&run_dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn secure_file_is_0600() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plan.json");
        write_secure_file(&path, b"{}").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
