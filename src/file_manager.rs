use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::charset::decode_stylesheet;
use crate::error::{LocalizeError, Result};

/// Maps `/`-separated local paths onto the filesystem under one root.
///
/// The filesystem is the only record of what has been fetched: a path that
/// exists is treated as done.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn new(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| {
            LocalizeError::io(format!("failed to create output root {:?}", base_dir), e)
        })?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The filesystem path a local path is stored at. Dot segments are
    /// refused so nothing lands outside the output root.
    pub fn path_for(&self, local_path: &str) -> Result<PathBuf> {
        let mut path = self.base_dir.clone();
        for segment in local_path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(LocalizeError::invalid_url(
                    local_path,
                    "local path leaves the output root",
                ));
            }
            path.push(segment);
        }
        Ok(path)
    }

    pub fn create_directories_for(&self, local_path: &str) -> Result<PathBuf> {
        let path = self.path_for(local_path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LocalizeError::io(format!("failed to create directory {:?}", parent), e)
            })?;
        }

        Ok(path)
    }

    pub fn file_exists(&self, local_path: &str) -> bool {
        self.path_for(local_path).map_or(false, |path| path.exists())
    }

    pub fn save_file(&self, local_path: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.create_directories_for(local_path)?;

        fs::write(&file_path, content)
            .map_err(|e| LocalizeError::io(format!("failed to write {:?}", file_path), e))?;

        Ok(file_path)
    }

    /// Reads a stored stylesheet as UTF-8 text, honouring its byte order
    /// mark or leading `@charset` rule.
    pub fn read_stylesheet(&self, local_path: &str) -> Result<String> {
        let file_path = self.path_for(local_path)?;
        let bytes = fs::read(&file_path)
            .map_err(|e| LocalizeError::io(format!("failed to read {:?}", file_path), e))?;
        Ok(decode_stylesheet(&bytes))
    }
}

/// Writes `content` to `path` only if nothing exists there yet.
///
/// Returns `Ok(false)` without touching the file when it already exists.
pub fn write_new_file(path: &Path, content: &[u8]) -> Result<bool> {
    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(LocalizeError::io(format!("failed to create {:?}", path), e)),
    };

    file.write_all(content)
        .map_err(|e| LocalizeError::io(format!("failed to write {:?}", path), e))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_file_creates_intermediate_directories() {
        let temp_dir = tempdir().unwrap();
        let file_manager = FileManager::new(temp_dir.path()).unwrap();

        let saved = file_manager
            .save_file("example.com/img/deep/x.png", b"PNG")
            .unwrap();

        assert_eq!(saved, temp_dir.path().join("example.com/img/deep/x.png"));
        assert_eq!(fs::read(&saved).unwrap(), b"PNG");
        assert!(file_manager.file_exists("example.com/img/deep/x.png"));
        assert!(!file_manager.file_exists("example.com/img/deep/y.png"));
    }

    #[test]
    fn test_path_for_keeps_special_characters() {
        let temp_dir = tempdir().unwrap();
        let file_manager = FileManager::new(temp_dir.path()).unwrap();

        let path = file_manager.path_for("example.com:8080/a%20b.png?w=1").unwrap();
        assert_eq!(path, temp_dir.path().join("example.com:8080").join("a%20b.png?w=1"));
    }

    #[test]
    fn test_path_for_refuses_dot_segments() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("root");
        let file_manager = FileManager::new(&root).unwrap();

        for local_path in ["../x.png", "example.com/../../x.png", "./x.png", ".."] {
            let err = file_manager.path_for(local_path).unwrap_err();
            assert!(matches!(err, LocalizeError::InvalidUrl { .. }));
        }
        assert!(file_manager.save_file("../escaped.png", b"x").is_err());
        assert!(!temp_dir.path().join("escaped.png").exists());
        assert!(!file_manager.file_exists("../root/x.png"));

        assert!(file_manager.path_for("example.com/..a/b..").is_ok());
    }

    #[test]
    fn test_read_stylesheet_decodes_declared_charset() {
        let temp_dir = tempdir().unwrap();
        let file_manager = FileManager::new(temp_dir.path()).unwrap();
        file_manager
            .save_file("example.com/s.css", b"@charset \"windows-1252\";a::after{content:\"\xE9\"}")
            .unwrap();
        file_manager.save_file("example.com/t.css", b"a{}\xff").unwrap();

        assert_eq!(
            file_manager.read_stylesheet("example.com/s.css").unwrap(),
            "@charset \"utf-8\";a::after{content:\"\u{e9}\"}"
        );
        assert!(file_manager.read_stylesheet("example.com/t.css").unwrap().starts_with("a{}"));
    }

    #[test]
    fn test_write_new_file_never_overwrites() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("out.html");

        assert!(write_new_file(&path, b"first").unwrap());
        assert!(!write_new_file(&path, b"second").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }
}
