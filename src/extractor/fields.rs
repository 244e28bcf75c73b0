//! Normalization of the raw directory bag into a [`MetadataRecord`].

use crate::error::AppError;
use crate::extractor::file_type::FileType;
use crate::extractor::raw::RawMetadata;
use crate::metadata::{HoursFormat, MetadataRecord};
use exif::{Context, Exif, In, Tag, Value};

const BYTES_PER_MB: f32 = 1024.0 * 1024.0;

/// TIFF/EP TimeZoneOffset, signed hours relative to UTC.
const TIME_ZONE_OFFSET_TIFF_EP: u16 = 0x882a;
/// EXIF 2.31 OffsetTimeOriginal, "+HH:MM".
const OFFSET_TIME_ORIGINAL: u16 = 0x9011;

/// Copies every attribute found in `raw` into `record`. Fields whose source
/// directory is missing are left untouched, so caller defaults survive.
pub fn populate(
    record: &mut MetadataRecord,
    file_type: FileType,
    raw: &RawMetadata,
    hours_format: HoursFormat,
) -> Result<(), AppError> {
    if let Some(exif) = &raw.exif {
        if let Some(taken) = ascii(exif, Tag::DateTimeOriginal) {
            record.set_taken_date(hours_format.parse_exif_date(&taken)?);
        }
        record.time_zone_offset = time_zone_offset(exif);
    }

    record.pixel_res = pixel_resolution(file_type, raw).map(|(w, h)| format!("{}x{}", w, h));

    if let Some(iptc) = &raw.iptc {
        record
            .set_country_code(iptc.country_code().as_deref())
            .set_country(iptc.country().as_deref());
        record.state_or_province = iptc.province_or_state();
        record.city = iptc.city();
        record.sublocation = iptc.sublocation();
        record.caption = iptc.caption();
        record.title = iptc.object_name();
        record.headline = iptc.headline();
        record.tags = iptc.keywords();
    }

    if let Some(exif) = &raw.exif {
        if let Some((lat, lon)) = geolocation(exif) {
            record.set_lat_long(lat, lon);
        }
        record.gps_datum = ascii(exif, Tag::GPSMapDatum);
    }

    if let Some(fs) = &raw.file_system {
        record.size_mb = Some(fs.file_size as f32 / BYTES_PER_MB);
        record.file_name = Some(fs.file_name.clone());
    }

    if let Some(exif) = &raw.exif {
        record.cam_model_make = camera(ascii(exif, Tag::Model), ascii(exif, Tag::Make));
    }

    Ok(())
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => values
            .iter()
            .map(|v| String::from_utf8_lossy(v).trim_end_matches('\0').trim().to_string())
            .find(|s| !s.is_empty()),
        _ => None,
    }
}

fn time_zone_offset(exif: &Exif) -> Option<String> {
    [Context::Tiff, Context::Exif]
        .into_iter()
        .find_map(|ctx| exif.get_field(Tag(ctx, TIME_ZONE_OFFSET_TIFF_EP), In::PRIMARY))
        .map(|f| f.display_value().to_string())
        .or_else(|| ascii(exif, Tag(Context::Exif, OFFSET_TIME_ORIGINAL)))
}

fn pixel_resolution(file_type: FileType, raw: &RawMetadata) -> Option<(u32, u32)> {
    let from_exif = raw.exif.as_ref().and_then(|exif| {
        let dim = |tag| exif.get_field(tag, In::PRIMARY)?.value.get_uint(0);
        dim(Tag::PixelXDimension)
            .zip(dim(Tag::PixelYDimension))
            .or_else(|| dim(Tag::ImageWidth).zip(dim(Tag::ImageLength)))
    });

    from_exif.or_else(|| {
        raw.image_directory(file_type)
            .map(|dir| (dir.width, dir.height))
    })
}

fn geolocation(exif: &Exif) -> Option<(f64, f64)> {
    let lat = degrees(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")?;
    let lon = degrees(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W")?;
    Some((lat, lon))
}

fn degrees(exif: &Exif, tag: Tag, reference: Tag, negative: &str) -> Option<f64> {
    let dms = match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(parts) if parts.len() == 3 => parts.iter().map(|r| r.to_f64()).collect::<Vec<_>>(),
        _ => return None,
    };
    let value = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
    if !value.is_finite() {
        return None;
    }

    match ascii(exif, reference) {
        Some(r) if r.eq_ignore_ascii_case(negative) => Some(-value),
        _ => Some(value),
    }
}

/// "Model (Make)", degrading to whichever half exists.
fn camera(model: Option<String>, make: Option<String>) -> Option<String> {
    match (model, make) {
        (Some(model), Some(make)) => Some(format!("{} ({})", model, make)),
        (Some(model), None) => Some(model),
        (None, Some(make)) => Some(format!("({})", make)),
        (None, None) => None,
    }
}
