use crate::error::AppError;
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Pattern of dates stored in the index (and declared in the index mapping).
pub const JSON_DATE_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Hour field of the EXIF date pattern: `HH` (0-23) or `hh` (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum HoursFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "12h")]
    TwelveHours,
}

impl HoursFormat {
    /// Parses an EXIF `yyyy:MM:dd HH:mm:ss` timestamp as UTC, strictly.
    pub fn parse_exif_date(self, value: &str) -> Result<DateTime<Utc>, AppError> {
        let trimmed = value.trim_end_matches('\0').trim();
        let naive = NaiveDateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S").map_err(|e| {
            AppError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            }
        })?;

        let naive = match self {
            HoursFormat::TwentyFourHours => naive,
            HoursFormat::TwelveHours => {
                // No am/pm marker: 12 is midnight, anything past 12 is out of range
                let hour = naive.hour();
                if !(1..=12).contains(&hour) {
                    return Err(AppError::InvalidDate {
                        value: value.to_string(),
                        reason: format!("hour {} out of range 1-12", hour),
                    });
                }
                if hour == 12 {
                    naive.with_hour(0).unwrap_or(naive)
                } else {
                    naive
                }
            }
        };

        Ok(Utc.from_utc_datetime(&naive))
    }
}

/// Fallback values applied before extraction so non-geotagged photos still
/// land somewhere on the globe.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DefaultMetadata {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub gps_lat_long: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// `file:///...`, `http://...`; the document id is derived from it.
    pub path: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "two_decimals::serialize"
    )]
    pub size_mb: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "taken_date")]
    taken_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    taken_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    taken_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_offset: Option<String>,
    /// Base64-encoded thumbnail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Model (Make)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cam_model_make: Option<String>,
    /// Width x Height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_res: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_or_province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublocation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_datum: Option<String>,
    /// "lat,lon", the geo_point string format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gps_lat_long: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MetadataRecord {
    pub fn new(path: Url) -> Self {
        Self {
            path,
            file_name: None,
            size_mb: None,
            taken_date: None,
            taken_year: None,
            taken_month: None,
            time_zone_offset: None,
            thumbnail: None,
            cam_model_make: None,
            pixel_res: None,
            country_code: None,
            country: None,
            state_or_province: None,
            city: None,
            sublocation: None,
            caption: None,
            title: None,
            headline: None,
            gps_datum: None,
            gps_lat_long: None,
            tags: Vec::new(),
        }
    }

    /// Only country and GPS coordinates are seeded: enough to filter and
    /// display non-geotagged photos.
    pub fn with_defaults(mut self, defaults: Option<&DefaultMetadata>) -> Self {
        if let Some(defaults) = defaults {
            self.set_country(defaults.country.as_deref());
            self.set_country_code(defaults.country_code.as_deref());
            self.set_gps_lat_long(defaults.gps_lat_long.as_deref());
        }
        self
    }

    pub fn taken_date(&self) -> Option<DateTime<Utc>> {
        self.taken_date
    }

    pub fn taken_year(&self) -> Option<i32> {
        self.taken_year
    }

    pub fn taken_month(&self) -> Option<u32> {
        self.taken_month
    }

    pub fn set_taken_date(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.taken_date = Some(date);
        self.taken_year = Some(date.year());
        self.taken_month = Some(date.month());
        self
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn gps_lat_long(&self) -> Option<&str> {
        self.gps_lat_long.as_deref()
    }

    // The three setters below keep defaults when handed a blank value.

    pub fn set_country(&mut self, country: Option<&str>) -> &mut Self {
        if let Some(country) = non_blank(country) {
            self.country = Some(country.to_string());
        }
        self
    }

    pub fn set_country_code(&mut self, code: Option<&str>) -> &mut Self {
        if let Some(code) = non_blank(code) {
            self.country_code = Some(code.to_string());
        }
        self
    }

    pub fn set_gps_lat_long(&mut self, lat_long: Option<&str>) -> &mut Self {
        if let Some(lat_long) = non_blank(lat_long) {
            match parse_lat_long(lat_long) {
                Some(_) => self.gps_lat_long = Some(lat_long.to_string()),
                None => log::warn!(
                    "Ignoring malformed GPS coordinates \"{}\" for {}",
                    lat_long,
                    self.path
                ),
            }
        }
        self
    }

    pub fn set_lat_long(&mut self, latitude: f64, longitude: f64) -> &mut Self {
        let lat_long = format!("{},{}", latitude, longitude);
        self.set_gps_lat_long(Some(&lat_long))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a "lat,lon" decimal-degree pair, checking ranges.
pub fn parse_lat_long(value: &str) -> Option<(f64, f64)> {
    let (lat, lon) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Some((lat, lon))
    } else {
        None
    }
}

mod taken_date {
    use super::JSON_DATE_PATTERN;
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(JSON_DATE_PATTERN).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, JSON_DATE_PATTERN)
                    .map(|naive| Utc.from_utc_datetime(&naive))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

mod two_decimals {
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<f32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_f32((v * 100.0).round() / 100.0),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MetadataRecord {
        MetadataRecord::new(Url::parse("file:///photos/a.jpg").unwrap())
    }

    #[test]
    fn taken_date_derives_year_and_month() {
        let mut r = record();
        let date = HoursFormat::TwentyFourHours
            .parse_exif_date("2021:12:25 18:30:00")
            .unwrap();
        r.set_taken_date(date);
        assert_eq!(r.taken_year(), Some(2021));
        assert_eq!(r.taken_month(), Some(12));
    }

    #[test]
    fn exif_date_parsing_is_strict() {
        let fmt = HoursFormat::TwentyFourHours;
        assert!(fmt.parse_exif_date("2021:13:01 10:00:00").is_err());
        assert!(fmt.parse_exif_date("2021-12-01 10:00:00").is_err());
        assert!(fmt.parse_exif_date("2021:12:01 25:00:00").is_err());
        assert!(fmt.parse_exif_date("    :  :     :  :  ").is_err());
    }

    #[test]
    fn twelve_hours_format_has_no_afternoon() {
        let fmt = HoursFormat::TwelveHours;
        let midnight = fmt.parse_exif_date("2022:01:01 12:15:00").unwrap();
        assert_eq!(midnight.format(JSON_DATE_PATTERN).to_string(), "2022-01-01 00:15:00");
        assert!(fmt.parse_exif_date("2022:01:01 13:15:00").is_err());
    }

    #[test]
    fn blank_values_never_overwrite_defaults() {
        let defaults = DefaultMetadata {
            country: Some("_Unknown_".into()),
            country_code: Some("XXX".into()),
            gps_lat_long: Some("25.0,-71.0".into()),
        };
        let mut r = record().with_defaults(Some(&defaults));
        r.set_country(Some("  "))
            .set_country_code(None)
            .set_gps_lat_long(Some(""));

        assert_eq!(r.country(), Some("_Unknown_"));
        assert_eq!(r.country_code(), Some("XXX"));
        assert_eq!(r.gps_lat_long(), Some("25.0,-71.0"));

        r.set_country(Some("France")).set_lat_long(48.85, 2.35);
        assert_eq!(r.country(), Some("France"));
        assert_eq!(r.gps_lat_long(), Some("48.85,2.35"));
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let mut r = record();
        r.set_gps_lat_long(Some("north,south"));
        r.set_gps_lat_long(Some("95.0,10.0"));
        assert_eq!(r.gps_lat_long(), None);
    }

    #[test]
    fn serializes_with_index_field_names() {
        let mut r = record();
        r.size_mb = Some(3.14159);
        r.set_taken_date(
            HoursFormat::TwentyFourHours
                .parse_exif_date("2021:12:25 18:30:00")
                .unwrap(),
        );
        r.cam_model_make = Some("EOS 5D (Canon)".into());

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["path"], "file:///photos/a.jpg");
        assert_eq!(json["takenDate"], "2021-12-25 18:30:00");
        assert_eq!(json["takenYear"], 2021);
        assert_eq!(json["takenMonth"], 12);
        assert_eq!(json["camModelMake"], "EOS 5D (Canon)");
        assert!((json["sizeMb"].as_f64().unwrap() - 3.14).abs() < 1e-6);
        assert!(json.get("gpsLatLong").is_none());
        assert!(json.get("tags").is_none());

        let back: MetadataRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.taken_date(), r.taken_date());
        assert_eq!(back.cam_model_make, r.cam_model_make);
    }
}
