// Blocking zip checks and extraction; callers run these on the blocking pool.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{PanelError, PanelResult};
use crate::core::version::SERVER_EXECUTABLE;

/// Anything smaller is an HTML error page rather than a server package.
pub const MIN_ARCHIVE_BYTES: u64 = 1024 * 1024;

/// Size, structure and content checks on a downloaded archive.
pub fn verify_archive(zip_path: &Path) -> PanelResult<()> {
    let size = std::fs::metadata(zip_path)
        .map_err(|e| PanelError::io(zip_path, e))?
        .len();
    if size < MIN_ARCHIVE_BYTES {
        return Err(PanelError::ArchiveTooSmall { size });
    }

    let file = std::fs::File::open(zip_path).map_err(|e| PanelError::io(zip_path, e))?;
    let archive = zip::ZipArchive::new(file)?;

    if !archive
        .file_names()
        .any(|name| name.contains(SERVER_EXECUTABLE))
    {
        return Err(PanelError::MissingArchiveEntry(SERVER_EXECUTABLE.to_string()));
    }

    debug!("Archive {:?} verified: {} bytes, {} entries", zip_path, size, archive.len());
    Ok(())
}

/// Extract every entry of `zip_path` into `out_dir`, overwriting files that
/// already exist. Entries escaping `out_dir` are rejected.
pub fn extract_archive(zip_path: &Path, out_dir: &Path) -> PanelResult<()> {
    let file = std::fs::File::open(zip_path).map_err(|e| PanelError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;

    std::fs::create_dir_all(out_dir).map_err(|e| PanelError::io(out_dir, e))?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let Some(rel_path) = zipped.enclosed_name() else {
            return Err(PanelError::Other(format!(
                "Invalid zip entry path: {}",
                zipped.name()
            )));
        };

        let out_path = out_dir.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| PanelError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PanelError::io(parent, e))?;
        }

        let mut out = std::fs::File::create(&out_path).map_err(|e| PanelError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| PanelError::io(&out_path, e))?;
    }

    Ok(())
}

/// Verify, extract into `install_dir`, then confirm the executable landed
/// where the panel will look for it.
pub fn install_archive(zip_path: &Path, install_dir: &Path) -> PanelResult<PathBuf> {
    verify_archive(zip_path)?;
    extract_archive(zip_path, install_dir)?;

    let executable = install_dir.join(SERVER_EXECUTABLE);
    if !executable.is_file() {
        return Err(PanelError::ExtractionIncomplete(executable));
    }
    Ok(executable)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::test_support::TempDir;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Write an uncompressed zip holding `entries` of `(name, size)` filled
    /// with zeros.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, usize)]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, size) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(&vec![0_u8; *size]).unwrap();
        }
        writer.finish().unwrap();
    }

    pub(crate) fn server_zip(path: &Path) {
        write_zip(
            path,
            &[
                ("bedrock_server.exe", 1_100_000),
                ("server.properties", 64),
                ("behavior_packs/vanilla/manifest.json", 16),
            ],
        );
    }

    #[test]
    fn small_payload_is_rejected_before_parsing() {
        let dir = TempDir::new("archive");
        let zip = dir.join("small.zip");
        std::fs::write(&zip, vec![b'<'; 500]).unwrap();

        let err = verify_archive(&zip).unwrap_err();
        assert!(matches!(err, PanelError::ArchiveTooSmall { size: 500 }));
    }

    #[test]
    fn large_non_zip_is_an_archive_error() {
        let dir = TempDir::new("archive");
        let zip = dir.join("page.zip");
        std::fs::write(&zip, vec![b'x'; MIN_ARCHIVE_BYTES as usize + 10]).unwrap();

        let err = verify_archive(&zip).unwrap_err();
        assert!(matches!(err, PanelError::Archive(_)));
    }

    #[test]
    fn archive_without_executable_is_rejected() {
        let dir = TempDir::new("archive");
        let zip = dir.join("other.zip");
        write_zip(&zip, &[("readme.bin", 1_100_000)]);

        let err = verify_archive(&zip).unwrap_err();
        assert!(matches!(err, PanelError::MissingArchiveEntry(_)));
    }

    #[test]
    fn nested_executable_fails_post_extraction_check() {
        let dir = TempDir::new("archive");
        let zip = dir.join("nested.zip");
        write_zip(&zip, &[("bin/bedrock_server.exe", 1_100_000)]);

        let err = install_archive(&zip, &dir.join("1.26.0.25")).unwrap_err();
        assert!(matches!(err, PanelError::ExtractionIncomplete(_)));
    }

    #[test]
    fn install_extracts_tree_and_keeps_existing_files() {
        let dir = TempDir::new("archive");
        let zip = dir.join("server.zip");
        server_zip(&zip);

        let install_dir = dir.join("1.26.0.25");
        std::fs::create_dir_all(install_dir.join("worlds")).unwrap();
        std::fs::write(install_dir.join("worlds").join("level.dat"), b"keep").unwrap();

        let exe = install_archive(&zip, &install_dir).unwrap();
        assert_eq!(exe, install_dir.join("bedrock_server.exe"));
        assert!(install_dir.join("behavior_packs/vanilla/manifest.json").is_file());
        assert_eq!(std::fs::read(install_dir.join("worlds").join("level.dat")).unwrap(), b"keep");
    }
}
