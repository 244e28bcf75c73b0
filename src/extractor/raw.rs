use crate::extractor::file_type::FileType;
use crate::extractor::iptc::IptcDirectory;

/// Pixel size declared by a container header (JPEG SOFn, PNG IHDR, HEIF ispe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDirectory {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemDirectory {
    pub file_name: String,
    pub file_size: u64,
}

/// Everything read from one file before normalization. Every directory is
/// optional: a photo without EXIF or IPTC is still a valid photo.
#[derive(Default)]
pub struct RawMetadata {
    pub exif: Option<exif::Exif>,
    /// Embedded EXIF thumbnail, captured while the EXIF segment is read.
    pub thumbnail: Option<Vec<u8>>,
    pub iptc: Option<IptcDirectory>,
    pub jpeg: Option<ImageDirectory>,
    pub png: Option<ImageDirectory>,
    pub heif: Option<ImageDirectory>,
    pub file_system: Option<FileSystemDirectory>,
}

// `exif::Exif` has no `Debug`, so only its presence is shown.
impl std::fmt::Debug for RawMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMetadata")
            .field("exif", &self.exif.is_some())
            .field("thumbnail", &self.thumbnail.as_ref().map(Vec::len))
            .field("iptc", &self.iptc)
            .field("jpeg", &self.jpeg)
            .field("png", &self.png)
            .field("heif", &self.heif)
            .field("file_system", &self.file_system)
            .finish()
    }
}

impl RawMetadata {
    /// Header dimensions of the container matching the detected file type.
    pub fn image_directory(&self, file_type: FileType) -> Option<ImageDirectory> {
        match file_type {
            FileType::Jpeg => self.jpeg,
            FileType::Png => self.png,
            FileType::Heif => self.heif,
            _ => None,
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.as_ref().map_or(false, |t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_directory_follows_file_type() {
        let raw = RawMetadata {
            jpeg: Some(ImageDirectory { width: 640, height: 480 }),
            png: Some(ImageDirectory { width: 1, height: 1 }),
            ..Default::default()
        };
        assert_eq!(
            raw.image_directory(FileType::Jpeg),
            Some(ImageDirectory { width: 640, height: 480 })
        );
        assert_eq!(raw.image_directory(FileType::Heif), None);
        assert_eq!(raw.image_directory(FileType::Gif), None);
    }

    #[test]
    fn empty_thumbnail_is_absent() {
        let mut raw = RawMetadata::default();
        assert!(!raw.has_thumbnail());
        raw.thumbnail = Some(Vec::new());
        assert!(!raw.has_thumbnail());
        raw.thumbnail = Some(vec![0xFF, 0xD8]);
        assert!(raw.has_thumbnail());
    }
}
