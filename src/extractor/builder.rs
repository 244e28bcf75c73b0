use crate::config::PhotoConfig;
use crate::error::AppError;
use crate::extractor::fields;
use crate::extractor::file_type::FileType;
use crate::extractor::raw::RawMetadata;
use crate::extractor::thumbnail::ThumbnailGenerator;
use crate::metadata::{DefaultMetadata, HoursFormat, MetadataRecord};
use url::Url;

/// Turns one file's raw metadata into a record ready to index.
pub struct MetadataRecordBuilder {
    defaults: Option<DefaultMetadata>,
    hours_format: HoursFormat,
    thumbnails: ThumbnailGenerator,
}

impl Default for MetadataRecordBuilder {
    fn default() -> Self {
        Self::new(None, HoursFormat::default(), ThumbnailGenerator::new(None))
    }
}

impl MetadataRecordBuilder {
    pub fn new(
        defaults: Option<DefaultMetadata>,
        hours_format: HoursFormat,
        thumbnails: ThumbnailGenerator,
    ) -> Self {
        Self {
            defaults,
            hours_format,
            thumbnails,
        }
    }

    pub fn from_config(config: &PhotoConfig) -> Self {
        let mut thumbnails = ThumbnailGenerator::new(config.thumbnail_dump_path.clone());
        if let Some(tool) = &config.heif_thumbnail_tool {
            thumbnails = thumbnails.with_heif_tool(tool.as_str());
        }
        Self::new(config.default_metadata.clone(), config.hours_format, thumbnails)
    }

    pub fn build(
        &self,
        uri: &Url,
        file_type: FileType,
        raw: &RawMetadata,
    ) -> Result<MetadataRecord, AppError> {
        log::info!("Extracting metadata from {}", uri);

        let mut record = MetadataRecord::new(uri.clone()).with_defaults(self.defaults.as_ref());
        fields::populate(&mut record, file_type, raw, self.hours_format)?;
        record.thumbnail = self.thumbnails.extract_thumbnail(uri, file_type, raw)?;

        log::debug!(
            "Metadata for {}: taken {:?}, location {:?}, {} tag(s)",
            uri,
            record.taken_date(),
            record.gps_lat_long(),
            record.tags.len()
        );
        Ok(record)
    }
}
