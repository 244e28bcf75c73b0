pub mod builder;
pub mod fields;
pub mod file_type;
pub mod iptc;
pub mod raw;
pub mod reader;
pub mod segments;
pub mod thumbnail;

pub use builder::MetadataRecordBuilder;
pub use file_type::FileType;
pub use raw::RawMetadata;
pub use reader::MetadataReader;
pub use thumbnail::ThumbnailGenerator;
