//! Directory <-> zip archive packing: walk a directory into a deflated
//! zip, or extract one back out.

use crate::error::TransferError;
use std::fs::File;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Recursively zip every file under `source_dir` into `archive_path`,
/// storing paths relative to `source_dir`, DEFLATE-compressed. No
/// documented symlink-following contract exists upstream; this walks
/// symlinks as `walkdir` finds them (the same as `os.walk`'s default).
pub fn zipdir(source_dir: &Path, archive_path: &Path) -> Result<(), TransferError> {
    let file = File::create(archive_path).map_err(|source| io_error(archive_path, source))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let relative = path
            .strip_prefix(source_dir)
            .expect("walkdir always yields paths under its root");
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else {
            writer.start_file(name, options)?;
            let mut source_file = File::open(path).map_err(|source| io_error(path, source))?;
            std::io::copy(&mut source_file, &mut writer).map_err(|source| io_error(path, source))?;
        }
    }

    writer.finish()?;
    tracing::debug!(source = %source_dir.display(), archive = %archive_path.display(), "packed archive");
    Ok(())
}

/// Extract `archive_path` into `dest_dir`, creating it if absent.
pub fn unzip(archive_path: &Path, dest_dir: &Path) -> Result<(), TransferError> {
    std::fs::create_dir_all(dest_dir).map_err(|source| io_error(dest_dir, source))?;
    let file = File::open(archive_path).map_err(|source| io_error(archive_path, source))?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(dest_dir)?;
    tracing::debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "unpacked archive");
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::Io { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn zipdir_then_unzip_round_trips_file_contents() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("nested")).unwrap();
        let mut f = File::create(source.path().join("nested/a.txt")).unwrap();
        f.write_all(b"ok\n").unwrap();

        let archive_dir = tempfile::tempdir().unwrap();
        let archive_path = archive_dir.path().join("output.zip");
        zipdir(source.path(), &archive_path).unwrap();

        let dest = tempfile::tempdir().unwrap();
        unzip(&archive_path, dest.path()).unwrap();

        let extracted = std::fs::read(dest.path().join("nested/a.txt")).unwrap();
        assert_eq!(extracted, b"ok\n");
    }

    #[test]
    fn unzip_rejects_corrupt_archive() {
        let archive_dir = tempfile::tempdir().unwrap();
        let archive_path = archive_dir.path().join("input.zip");
        std::fs::write(&archive_path, b"not a zip").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let result = unzip(&archive_path, dest.path());
        assert!(result.is_err());
    }
}
