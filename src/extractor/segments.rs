//! Container walkers: split JPEG, PNG and HEIF files into the metadata
//! segments handed to the segment readers. HEIF image extents are picked up
//! from its `ispe` properties on the way.

use crate::error::AppError;
use crate::extractor::raw::ImageDirectory;
use std::borrow::Cow;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// JPEG APP1: EXIF (or XMP) with its preamble
    App1,
    /// JPEG APP13: Photoshop image resources
    App13,
    /// Bare TIFF structure holding EXIF (PNG eXIf chunk, HEIF Exif item)
    Tiff,
}

#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub data: Cow<'a, [u8]>,
}

#[derive(Debug, Default)]
pub struct Container<'a> {
    pub segments: Vec<Segment<'a>>,
    /// Only filled for HEIF; JPEG and PNG headers are read through `image`
    pub dimensions: Option<ImageDirectory>,
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

pub fn jpeg(data: &[u8]) -> Result<Container<'_>, AppError> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(AppError::corrupt("JPEG", "missing start of image marker"));
    }

    let mut container = Container::default();
    let mut pos = 2;

    while pos < data.len() {
        if data[pos] != 0xFF {
            return Err(AppError::corrupt(
                "JPEG",
                format!("expected marker at offset {}, found {:#04x}", pos, data[pos]),
            ));
        }
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        let marker = *data
            .get(pos)
            .ok_or_else(|| AppError::corrupt("JPEG", "truncated marker"))?;
        pos += 1;

        match marker {
            // EOI, or SOS: nothing but entropy-coded data follows
            0xD9 | 0xDA => break,
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let len = data
            .get(pos..pos + 2)
            .map(be_u16)
            .ok_or_else(|| AppError::corrupt("JPEG", "truncated segment length"))?
            as usize;
        if len < 2 {
            return Err(AppError::corrupt("JPEG", format!("invalid segment length {}", len)));
        }
        let body = data
            .get(pos + 2..pos + len)
            .ok_or_else(|| AppError::corrupt("JPEG", format!("truncated segment {:#04x}", marker)))?;
        log::trace!("JPEG segment {:#04x} at offset {} ({} bytes)", marker, pos, len);

        match marker {
            0xE1 => container.segments.push(Segment {
                kind: SegmentKind::App1,
                data: Cow::Borrowed(body),
            }),
            0xED => container.segments.push(Segment {
                kind: SegmentKind::App13,
                data: Cow::Borrowed(body),
            }),
            _ => {}
        }

        pos += len;
    }

    Ok(container)
}

pub fn png(data: &[u8]) -> Result<Container<'_>, AppError> {
    if !data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Err(AppError::corrupt("PNG", "missing signature"));
    }

    let mut container = Container::default();
    let mut pos = 8;

    while pos + 8 <= data.len() {
        let len = be_u32(&data[pos..pos + 4]) as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        let body = data.get(pos + 8..pos + 8 + len).ok_or_else(|| {
            AppError::corrupt(
                "PNG",
                format!("truncated {} chunk", String::from_utf8_lossy(chunk_type)),
            )
        })?;

        match chunk_type {
            b"eXIf" => container.segments.push(Segment {
                kind: SegmentKind::Tiff,
                data: Cow::Borrowed(body),
            }),
            b"IEND" => break,
            _ => {}
        }

        // length + type + data + CRC
        pos += 12 + len;
    }

    Ok(container)
}

pub fn heif(data: &[u8]) -> Result<Container<'_>, AppError> {
    let mut sizes = Vec::new();
    walk_boxes(data, &mut sizes)?;

    let mut container = Container {
        segments: Vec::new(),
        // The primary image is the largest one; thumbnails carry their own ispe
        dimensions: sizes
            .into_iter()
            .max_by_key(|d| d.width as u64 * d.height as u64),
    };

    match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => container.segments.push(Segment {
            kind: SegmentKind::Tiff,
            data: Cow::Owned(exif.buf().to_vec()),
        }),
        Err(exif::Error::NotFound(_)) => log::trace!("HEIF file carries no Exif item"),
        Err(e) => return Err(e.into()),
    }

    Ok(container)
}

fn walk_boxes(data: &[u8], sizes: &mut Vec<ImageDirectory>) -> Result<(), AppError> {
    let mut pos = 0;

    while pos + 8 <= data.len() {
        let mut size = be_u32(&data[pos..pos + 4]) as u64;
        let box_type = &data[pos + 4..pos + 8];
        let mut header = 8;

        if size == 1 {
            let large = data
                .get(pos + 8..pos + 16)
                .ok_or_else(|| AppError::corrupt("HEIF", "truncated box header"))?;
            size = u64::from_be_bytes([
                large[0], large[1], large[2], large[3], large[4], large[5], large[6], large[7],
            ]);
            header = 16;
        } else if size == 0 {
            size = (data.len() - pos) as u64;
        }

        let end = (pos as u64)
            .checked_add(size)
            .filter(|end| size >= header as u64 && *end <= data.len() as u64)
            .ok_or_else(|| {
                AppError::corrupt(
                    "HEIF",
                    format!("invalid size {} for box {}", size, String::from_utf8_lossy(box_type)),
                )
            })? as usize;
        let body = &data[pos + header..end];

        match box_type {
            // full box: version and flags precede the children
            b"meta" if body.len() >= 4 => walk_boxes(&body[4..], sizes)?,
            b"iprp" | b"ipco" => walk_boxes(body, sizes)?,
            b"ispe" if body.len() >= 12 => sizes.push(ImageDirectory {
                width: be_u32(&body[4..8]),
                height: be_u32(&body[8..12]),
            }),
            _ => {}
        }

        pos = end;
    }

    Ok(())
}
