use crate::error::AppError;
use crate::extractor::{FileType, MetadataReader, RawMetadata};
use std::path::Path;
use url::Url;
use walkdir::{DirEntry, WalkDir};

/// Outcome of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub processed_ok: usize,
    pub processed_nok: usize,
    pub skipped: usize,
    pub error_messages: Vec<String>,
}

impl ExtractionResult {
    fn fail(&mut self, source: impl std::fmt::Display, err: &AppError) {
        log::error!("Failed to process {}: {}", source, err);
        self.processed_nok += 1;
        self.error_messages.push(format!("{}: {}", source, err));
    }
}

pub struct FilesystemExplorer {
    reader: MetadataReader,
}

impl Default for FilesystemExplorer {
    fn default() -> Self {
        Self::new(MetadataReader::default())
    }
}

impl FilesystemExplorer {
    pub fn new(reader: MetadataReader) -> Self {
        Self { reader }
    }

    /// Walks `root` (following symlinks) down to `max_depth` levels, where 1
    /// means the files directly under `root` and `None` means unbounded.
    ///
    /// JPEG, PNG and HEIF files are read and handed to `callback`; other files
    /// are skipped. A failure on one entry (including a dangling link) is
    /// counted and the walk goes on. Failing to read `root` itself stops the
    /// walk and returns the counts so far.
    pub fn explore<F>(&self, root: &Path, max_depth: Option<usize>, mut callback: F) -> ExtractionResult
    where
        F: FnMut(&Url, FileType, &RawMetadata) -> Result<(), AppError>,
    {
        let mut result = ExtractionResult::default();

        let root = match root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                log::error!("Cannot explore {:?}: {}", root, e);
                result
                    .error_messages
                    .push(format!("{}: {}", root.display(), e));
                return result;
            }
        };
        log::info!(
            "Starting file discovery in {:?} (max depth: {:?})",
            root,
            max_depth
        );

        let mut walker = WalkDir::new(&root).follow_links(true).sort_by_file_name();
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Dangling links, symlink loops and unreadable subdirectories
                Err(e) if e.depth() > 0 => {
                    let source = e
                        .path()
                        .and_then(|p| Url::from_file_path(p).ok())
                        .map_or_else(|| root.display().to_string(), |uri| uri.to_string());
                    result.fail(source, &AppError::from(e));
                    continue;
                }
                Err(e) => {
                    log::error!("File discovery aborted: {}", e);
                    result.error_messages.push(e.to_string());
                    break;
                }
            };
            if !entry.file_type().is_file() {
                log::trace!("Skipping non-file entry: {:?}", entry.path());
                continue;
            }

            self.visit(&entry, &mut callback, &mut result);
        }

        log::info!(
            "File discovery complete: {} ok, {} failed, {} skipped",
            result.processed_ok,
            result.processed_nok,
            result.skipped
        );
        result
    }

    fn visit<F>(&self, entry: &DirEntry, callback: &mut F, result: &mut ExtractionResult)
    where
        F: FnMut(&Url, FileType, &RawMetadata) -> Result<(), AppError>,
    {
        let path = entry.path();

        let file_type = match FileType::detect_file(path) {
            Ok(file_type) => file_type,
            Err(e) => return result.fail(path.display(), &AppError::from(e)),
        };
        if !file_type.is_supported() {
            log::warn!("Skipping {:?}: unsupported file type {}", path, file_type);
            result.skipped += 1;
            return;
        }

        let uri = match Url::from_file_path(path) {
            Ok(uri) => uri,
            Err(()) => {
                let err = AppError::InvalidUri(path.display().to_string());
                return result.fail(path.display(), &err);
            }
        };
        log::debug!("Processing {} file {}", file_type, uri);

        match self
            .reader
            .read_file(path, file_type)
            .and_then(|raw| callback(&uri, file_type, &raw))
        {
            Ok(()) => result.processed_ok += 1,
            Err(e) => result.fail(&uri, &e),
        }
    }
}
