use crate::utils::error::{PipelineError, Result};
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Top-level files in `dir` with the given extension, sorted by path.
///
/// Fails with `NoMatchingFiles` when nothing matches.
pub fn collect_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
                images.push(path);
            }
        }
    }

    if images.is_empty() {
        return Err(PipelineError::NoMatchingFiles {
            dir: dir.to_path_buf(),
            pattern: format!("*.{}", extension),
        });
    }

    images.sort();
    Ok(images)
}

/// 將圖檔壓成記憶體中的 ZIP，只保留檔名（不含目錄）
pub fn zip_images(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::InvalidConfigValueError {
                field: "image".to_string(),
                value: path.display().to_string(),
                reason: "Path has no file name".to_string(),
            })?;

        tracing::debug!("Adding {} to archive", name);
        zip.start_file(name, options)?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t2m_2024031000.png"), b"b").unwrap();
        std::fs::write(dir.path().join("apcp_2024031000.png"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let images = collect_images(dir.path(), "png").unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["apcp_2024031000.png", "t2m_2024031000.png"]);
    }

    #[test]
    fn test_collect_images_empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        let err = collect_images(dir.path(), "png").unwrap_err();
        assert!(matches!(err, PipelineError::NoMatchingFiles { .. }));
    }

    #[test]
    fn test_zip_keeps_base_names_only() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("run").join("00z");
        std::fs::create_dir_all(&nested).unwrap();
        let image = nested.join("wind10m_f024.png");
        std::fs::write(&image, b"fake png bytes").unwrap();

        let bytes = zip_images(&[image]).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "wind10m_f024.png");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"fake png bytes");
    }
}
