use crate::error::{LapsecamError, Result};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip archives are derived artifacts and never media assets
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// `<path>.zip`, next to `path`
pub(crate) fn sibling_archive(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".zip");
    PathBuf::from(name)
}

/// Write every regular file below `source` into a zip at `dest`, with entry
/// names relative to `source`. Hidden files and zip files are skipped. The
/// archive appears at `dest` only once complete. Blocking.
pub fn zip_directory(source: &Path, dest: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(source, &mut files)?;
    files.sort();

    let partial = partial_path(dest)?;
    match write_archive(source, &files, &partial) {
        Ok(()) => {
            fs::rename(&partial, dest)?;
            debug!("Archived {} files into {}", files.len(), dest.display());
            Ok(files.len())
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn partial_path(dest: &Path) -> Result<PathBuf> {
    let name = dest
        .file_name()
        .ok_or_else(|| LapsecamError::system(format!("bad archive path {}", dest.display())))?;
    Ok(dest.with_file_name(format!(".{}.partial", name.to_string_lossy())))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, out)?;
        } else if file_type.is_file() && !is_archive(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn compression_for(path: &Path) -> CompressionMethod {
    // Already-compressed formats gain nothing from deflate
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg" | "png" | "mp4" | "h264") => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}

fn write_archive(base: &Path, files: &[PathBuf], dest: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));

    for path in files {
        let relative = path
            .strip_prefix(base)
            .map_err(|_| LapsecamError::system(format!("{} escaped archive root", path.display())))?;
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<Cow<'_, str>>>()
            .join("/");

        let options = FileOptions::default()
            .compression_method(compression_for(path))
            .unix_permissions(0o644);
        zip.start_file(entry_name, options)?;
        io::copy(&mut File::open(path)?, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}
