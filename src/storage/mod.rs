//! Storage Layer
//!
//! Platform directories for configuration and saved results.

use anyhow::Result;
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "safetydashboard", "SafetyDashboard")
        .ok_or_else(|| anyhow::anyhow!("Could not determine project directories"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Write an annotated image into `dir`, returning the file written
///
/// The name is derived from the uploaded file, e.g. `cam1.png` becomes
/// `cam1_detected.jpg`.
pub fn save_annotated_image(dir: &Path, source_name: &str, jpeg: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "result".to_string());
    let path = dir.join(format!("{}_detected.jpg", stem));
    std::fs::write(&path, jpeg)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_annotated_image() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");

        let path = save_annotated_image(&out, "cam1.png", &[0xff, 0xd8]).unwrap();
        assert_eq!(path, out.join("cam1_detected.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xd8]);
    }

    #[test]
    fn test_save_annotated_image_without_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_annotated_image(dir.path(), "", &[1]).unwrap();
        assert_eq!(path.file_name().unwrap(), "result_detected.jpg");
    }
}
