use crate::error::AppError;
use crate::extractor::file_type::FileType;
use crate::extractor::raw::RawMetadata;
use base64::{engine::general_purpose, Engine};
use image::{DynamicImage, ImageOutputFormat};
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Command;
use url::Url;

pub const THUMBNAIL_SIZE: u32 = 160;
pub const MAGICK: &str = "magick";

pub struct ThumbnailGenerator {
    dump_path: Option<PathBuf>,
    heif_tool: String,
}

impl ThumbnailGenerator {
    pub fn new(dump_path: Option<PathBuf>) -> Self {
        Self {
            dump_path,
            heif_tool: MAGICK.to_string(),
        }
    }

    /// ImageMagick-compatible command used for HEIF previews.
    pub fn with_heif_tool(mut self, tool: impl Into<String>) -> Self {
        self.heif_tool = tool.into();
        self
    }

    /// Returns the base64 thumbnail for a photo: the embedded EXIF one when
    /// present, otherwise a preview fitting 160x160.
    pub fn extract_thumbnail(
        &self,
        uri: &Url,
        file_type: FileType,
        raw: &RawMetadata,
    ) -> Result<Option<String>, AppError> {
        let (bytes, extension) = match raw.thumbnail.as_deref().filter(|t| !t.is_empty()) {
            Some(embedded) => (embedded.to_vec(), "jpg"),
            None => {
                log::warn!(
                    "No thumbnail found in metadata for {} -> generating thumbnail from photo",
                    uri
                );
                let path = uri
                    .to_file_path()
                    .map_err(|_| AppError::InvalidUri(uri.to_string()))?;
                match file_type {
                    FileType::Heif => (magick_thumbnail(&self.heif_tool, &path)?, "jpg"),
                    other => (resize(&path, other)?, other.common_extension()),
                }
            }
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        if let Some(dump_path) = &self.dump_path {
            let file_name = raw
                .file_system
                .as_ref()
                .map(|fs| fs.file_name.as_str())
                .unwrap_or_default();
            let target = dump_path.join(format!("{}_thumbnail.{}", file_name, extension));
            log::debug!("Dumping thumbnail of {} to {:?}", uri, target);
            fs::write(&target, &bytes)?;
        }

        Ok(Some(general_purpose::STANDARD.encode(&bytes)))
    }
}

fn resize(path: &Path, file_type: FileType) -> Result<Vec<u8>, AppError> {
    let image = image::open(path)?;
    let thumbnail = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    log::trace!(
        "Resized {:?} from {}x{} to {}x{}",
        path,
        image.width(),
        image.height(),
        thumbnail.width(),
        thumbnail.height()
    );

    let mut cursor = Cursor::new(Vec::new());
    match file_type {
        FileType::Png => thumbnail.write_to(&mut cursor, ImageOutputFormat::Png)?,
        _ => DynamicImage::ImageRgb8(thumbnail.to_rgb8())
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(85))?,
    }
    Ok(cursor.into_inner())
}

fn magick_thumbnail(tool: &str, path: &Path) -> Result<Vec<u8>, AppError> {
    let size = format!("{}x{}", THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let output = Command::new(tool)
        .arg(path)
        .args(["-thumbnail", &size, "jpg:-"])
        .output()
        .map_err(|e| AppError::ThumbnailTool {
            tool: tool.to_string(),
            reason: match e.kind() {
                ErrorKind::NotFound => "not found on PATH".to_string(),
                _ => e.to_string(),
            },
        })?;

    if !output.status.success() {
        return Err(AppError::ThumbnailTool {
            tool: tool.to_string(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output.stdout)
}
