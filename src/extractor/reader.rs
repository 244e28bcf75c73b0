use crate::error::AppError;
use crate::extractor::file_type::FileType;
use crate::extractor::iptc::{IptcDirectory, PHOTOSHOP_PREAMBLE};
use crate::extractor::raw::{FileSystemDirectory, ImageDirectory, RawMetadata};
use crate::extractor::segments::{self, Segment, SegmentKind};
use exif::{In, Tag};
use image::ImageFormat;
use std::fs;
use std::io::Cursor;
use std::path::Path;

const EXIF_PREAMBLE: &[u8] = b"Exif\0\0";

/// Reads one kind of metadata segment into the raw directory bag.
pub trait SegmentReader: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_read(&self, segment: &Segment<'_>) -> bool;
    fn read(&self, segment: &Segment<'_>, raw: &mut RawMetadata) -> Result<(), AppError>;
}

pub struct ExifSegmentReader;

impl ExifSegmentReader {
    fn tiff<'s>(segment: &'s Segment<'_>) -> Option<&'s [u8]> {
        match segment.kind {
            SegmentKind::App1 => segment.data.strip_prefix(EXIF_PREAMBLE),
            SegmentKind::Tiff => Some(&segment.data[..]),
            SegmentKind::App13 => None,
        }
    }
}

impl SegmentReader for ExifSegmentReader {
    fn name(&self) -> &'static str {
        "EXIF"
    }

    fn can_read(&self, segment: &Segment<'_>) -> bool {
        Self::tiff(segment).is_some()
    }

    fn read(&self, segment: &Segment<'_>, raw: &mut RawMetadata) -> Result<(), AppError> {
        let Some(tiff) = Self::tiff(segment) else {
            return Ok(());
        };
        let exif = exif::Reader::new().read_raw(tiff.to_vec())?;
        log::trace!("Read {} EXIF fields", exif.fields().count());
        raw.exif = Some(exif);
        Ok(())
    }
}

pub struct IptcSegmentReader;

impl SegmentReader for IptcSegmentReader {
    fn name(&self) -> &'static str {
        "IPTC"
    }

    fn can_read(&self, segment: &Segment<'_>) -> bool {
        segment.kind == SegmentKind::App13 && segment.data.starts_with(PHOTOSHOP_PREAMBLE)
    }

    fn read(&self, segment: &Segment<'_>, raw: &mut RawMetadata) -> Result<(), AppError> {
        let resources = &segment.data[PHOTOSHOP_PREAMBLE.len()..];
        if let Some(iptc) = IptcDirectory::from_photoshop_resources(resources)? {
            log::trace!("Read {} IPTC datasets", iptc.datasets().len());
            raw.iptc = Some(iptc);
        }
        Ok(())
    }
}

/// Wraps the EXIF reader and keeps a copy of the embedded thumbnail, which
/// the EXIF directory only describes by offset and length into the segment.
pub struct ThumbnailCapture<R> {
    inner: R,
}

impl<R: SegmentReader> ThumbnailCapture<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn capture(exif: &exif::Exif) -> Option<Vec<u8>> {
        let offset = exif
            .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        let length = exif
            .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        if length == 0 {
            return None;
        }

        // Offsets are relative to the TIFF header, which is where buf() starts
        match exif.buf().get(offset..offset + length) {
            Some(bytes) => Some(bytes.to_vec()),
            None => {
                log::warn!(
                    "Embedded thumbnail [{}..+{}] lies outside the EXIF segment ({} bytes)",
                    offset,
                    length,
                    exif.buf().len()
                );
                None
            }
        }
    }
}

impl<R: SegmentReader> SegmentReader for ThumbnailCapture<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn can_read(&self, segment: &Segment<'_>) -> bool {
        self.inner.can_read(segment)
    }

    fn read(&self, segment: &Segment<'_>, raw: &mut RawMetadata) -> Result<(), AppError> {
        self.inner.read(segment, raw)?;
        if let Some(thumbnail) = raw.exif.as_ref().and_then(Self::capture) {
            log::trace!("Captured embedded thumbnail ({} bytes)", thumbnail.len());
            raw.thumbnail = Some(thumbnail);
        }
        Ok(())
    }
}

/// Extraction context: the set of segment readers applied to every file.
/// Built once and shared by all files of a walk.
pub struct MetadataReader {
    readers: Vec<Box<dyn SegmentReader>>,
}

impl Default for MetadataReader {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ThumbnailCapture::new(ExifSegmentReader)),
            Box::new(IptcSegmentReader),
        ])
    }
}

impl MetadataReader {
    pub fn new(readers: Vec<Box<dyn SegmentReader>>) -> Self {
        Self { readers }
    }

    pub fn read_file(&self, path: &Path, file_type: FileType) -> Result<RawMetadata, AppError> {
        let data = fs::read(path)?;
        let mut raw = self.read_bytes(&data, file_type)?;
        raw.file_system = Some(FileSystemDirectory {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_size: data.len() as u64,
        });
        Ok(raw)
    }

    pub fn read_bytes(&self, data: &[u8], file_type: FileType) -> Result<RawMetadata, AppError> {
        let container = match file_type {
            FileType::Jpeg => segments::jpeg(data)?,
            FileType::Png => segments::png(data)?,
            FileType::Heif => segments::heif(data)?,
            other => return Err(AppError::UnsupportedMedia(other.name().to_string())),
        };

        let mut raw = RawMetadata::default();
        match file_type {
            FileType::Jpeg => raw.jpeg = Some(header_dimensions(data, ImageFormat::Jpeg)?),
            FileType::Png => raw.png = Some(header_dimensions(data, ImageFormat::Png)?),
            _ => raw.heif = container.dimensions,
        }

        for segment in &container.segments {
            for reader in self.readers.iter().filter(|r| r.can_read(segment)) {
                log::trace!("{} reader handles {:?} segment", reader.name(), segment.kind);
                reader.read(segment, &mut raw)?;
            }
        }

        Ok(raw)
    }
}

fn header_dimensions(data: &[u8], format: ImageFormat) -> Result<ImageDirectory, AppError> {
    let (width, height) = image::io::Reader::with_format(Cursor::new(data), format).into_dimensions()?;
    Ok(ImageDirectory { width, height })
}
