//! Archive detection and extraction for fetched payloads.

use std::fs::File;
use std::path::Path;

use crate::fetch::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
}

/// Detects an archive payload from the path component of a URL or file
/// name. The query string, if any, is ignored.
pub fn detect(name: &str) -> Option<ArchiveKind> {
    let path = name.split('?').next().unwrap_or(name).to_ascii_lowercase();
    if path.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if path.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Extracts `archive_file` into `dst_dir`.
pub fn extract(kind: ArchiveKind, archive_file: &Path, dst_dir: &Path) -> Result<(), FetchError> {
    std::fs::create_dir_all(dst_dir)?;
    match kind {
        ArchiveKind::Zip => extract_zip(archive_file, dst_dir),
        ArchiveKind::TarGz => {
            let file = File::open(archive_file)?;
            let decoder = flate2::read::GzDecoder::new(file);
            unpack_tar(tar::Archive::new(decoder), dst_dir)
        }
        ArchiveKind::Tar => {
            let file = File::open(archive_file)?;
            unpack_tar(tar::Archive::new(file), dst_dir)
        }
    }
}

fn unpack_tar<R: std::io::Read>(
    mut archive: tar::Archive<R>,
    dst_dir: &Path,
) -> Result<(), FetchError> {
    // tar::Archive::unpack rejects entries escaping the destination.
    archive
        .unpack(dst_dir)
        .map_err(|e| FetchError::Archive(e.to_string()))
}

fn extract_zip(archive_file: &Path, dst_dir: &Path) -> Result<(), FetchError> {
    let file = File::open(archive_file)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| FetchError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FetchError::Archive(e.to_string()))?;

        // enclosed_name rejects absolute paths and `..` traversal.
        let Some(relative) = entry.enclosed_name() else {
            return Err(FetchError::Archive(format!(
                "archive entry escapes destination: {}",
                entry.name()
            )));
        };
        let out_path = dst_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    Ok(())
}
