use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::Document;

/// Reads `.txt` files under a directory as documents.
///
/// Files are visited recursively in sorted path order. The source id is the path
/// relative to the root, without extension, with `/` separators (`mn/mn1` for
/// `<root>/mn/mn1.txt`). Invalid UTF-8 is decoded lossily.
#[derive(Debug, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self { Self }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load_paths(data_dir, self.list_txt_files(data_dir))
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        self.load_paths(data_dir, files)
    }

    pub fn load_file(&self, data_dir: &Path, file_path: &Path) -> Result<Document> {
        let text = self.read_file_content(file_path)?;
        let filename = file_path
            .file_name()
            .map_or_else(|| file_path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
        Ok(Document { source_id: self.source_id(file_path, data_dir), filename, text })
    }

    /// Load the given files; one that cannot be read is logged and skipped.
    pub fn load_paths(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Document>> {
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("reading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            match self.load_file(data_dir, file_path) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(file = %file_path.display(), error = %e, "skipping unreadable file"),
            }
        }
        info!(count = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn source_id(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path).with_extension("");
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(|e| e.path().to_path_buf())
            .collect();
        txt_files.sort();
        txt_files
    }
}
