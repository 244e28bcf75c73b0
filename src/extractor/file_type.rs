use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Jpeg,
    Png,
    Heif,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Pdf,
    Unknown,
}

impl FileType {
    /// Classifies a file from its leading bytes.
    pub fn detect(header: &[u8]) -> FileType {
        infer::get(header).map_or(FileType::Unknown, |kind| Self::from_mime(kind.mime_type()))
    }

    pub fn detect_file(path: &Path) -> std::io::Result<FileType> {
        Ok(infer::get_from_path(path)?.map_or(FileType::Unknown, |kind| Self::from_mime(kind.mime_type())))
    }

    fn from_mime(mime: &str) -> FileType {
        match mime {
            "image/jpeg" => FileType::Jpeg,
            "image/png" => FileType::Png,
            "image/heif" => FileType::Heif,
            "image/gif" => FileType::Gif,
            "image/bmp" => FileType::Bmp,
            "image/tiff" => FileType::Tiff,
            "image/webp" => FileType::WebP,
            "application/pdf" => FileType::Pdf,
            _ => FileType::Unknown,
        }
    }

    /// Only these formats are extracted; anything else is skipped.
    pub fn is_supported(self) -> bool {
        matches!(self, FileType::Jpeg | FileType::Png | FileType::Heif)
    }

    pub fn name(self) -> &'static str {
        match self {
            FileType::Jpeg => "JPEG",
            FileType::Png => "PNG",
            FileType::Heif => "HEIF",
            FileType::Gif => "GIF",
            FileType::Bmp => "BMP",
            FileType::Tiff => "TIFF",
            FileType::WebP => "WebP",
            FileType::Pdf => "PDF",
            FileType::Unknown => "Unknown",
        }
    }

    pub fn common_extension(self) -> &'static str {
        match self {
            FileType::Jpeg => "jpg",
            FileType::Png => "png",
            FileType::Heif => "heic",
            FileType::Gif => "gif",
            FileType::Bmp => "bmp",
            FileType::Tiff => "tiff",
            FileType::WebP => "webp",
            FileType::Pdf => "pdf",
            FileType::Unknown => "",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_formats() {
        assert_eq!(FileType::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), FileType::Jpeg);
        assert_eq!(FileType::detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), FileType::Png);
        assert_eq!(FileType::detect(b"\0\0\0\x18ftypheic\0\0\0\0mif1heic"), FileType::Heif);
        assert_eq!(FileType::detect(b"\0\0\0\x18ftypmif1\0\0\0\0mif1heic"), FileType::Heif);
    }

    #[test]
    fn other_formats_are_not_supported() {
        for (header, expected) in [
            (&b"%PDF-1.7"[..], FileType::Pdf),
            (&b"GIF89a\x01\x00"[..], FileType::Gif),
            (&b"RIFF\0\0\0\0WEBPVP8 "[..], FileType::WebP),
            (&b"\0\0\0\x18ftypisom\0\0\0\0isommp41"[..], FileType::Unknown),
            (&b"hello world"[..], FileType::Unknown),
            (&b""[..], FileType::Unknown),
        ] {
            let detected = FileType::detect(header);
            assert_eq!(detected, expected);
            assert!(!detected.is_supported());
        }
    }
}
