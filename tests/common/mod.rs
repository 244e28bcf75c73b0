#![allow(dead_code)]

use async_trait::async_trait;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{ImageOutputFormat, RgbImage};
use photo_indexer::error::AppError;
use photo_indexer::extractor::iptc::{self, DataSet};
use photo_indexer::search::{Connector, SearchBackend, SearchHits};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Photo fixtures

pub fn ascii(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

pub fn long(tag: Tag, value: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Long(vec![value]),
    }
}

/// GPS fields for a position given in decimal degrees.
pub fn gps(latitude: f64, longitude: f64) -> Vec<Field> {
    fn dms(value: f64) -> Value {
        let value = value.abs();
        let degrees = value.trunc();
        let minutes = ((value - degrees) * 60.0).trunc();
        let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
        Value::Rational(vec![
            Rational::from((degrees as u32, 1)),
            Rational::from((minutes as u32, 1)),
            Rational::from(((seconds * 1000.0).round() as u32, 1000)),
        ])
    }
    let field = |tag, value| Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    };
    vec![
        field(
            Tag::GPSLatitudeRef,
            Value::Ascii(vec![if latitude < 0.0 { b"S".to_vec() } else { b"N".to_vec() }]),
        ),
        field(Tag::GPSLatitude, dms(latitude)),
        field(
            Tag::GPSLongitudeRef,
            Value::Ascii(vec![if longitude < 0.0 { b"W".to_vec() } else { b"E".to_vec() }]),
        ),
        field(Tag::GPSLongitude, dms(longitude)),
    ]
}

pub fn iptc_dataset(number: u8, value: &str) -> DataSet {
    DataSet {
        record: iptc::APPLICATION_RECORD,
        number,
        value: value.as_bytes().to_vec(),
    }
}

/// A real, decodable JPEG with optional EXIF (and embedded thumbnail) and
/// IPTC segments spliced in after SOI.
#[derive(Default)]
pub struct JpegFixture {
    pub width: u32,
    pub height: u32,
    pub exif: Vec<Field>,
    pub thumbnail: Option<Vec<u8>>,
    pub iptc: Vec<DataSet>,
}

impl JpegFixture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn exif(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.exif.extend(fields);
        self
    }

    pub fn thumbnail(mut self, thumbnail: Vec<u8>) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn iptc(mut self, datasets: impl IntoIterator<Item = DataSet>) -> Self {
        self.iptc.extend(datasets);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let plain = encode_jpeg(self.width, self.height);
        let mut segments = Vec::new();

        if !self.exif.is_empty() || self.thumbnail.is_some() {
            let mut writer = Writer::new();
            for field in &self.exif {
                writer.push_field(field);
            }
            if let Some(thumbnail) = &self.thumbnail {
                writer.set_jpeg(thumbnail, In::THUMBNAIL);
            }
            let mut tiff = Cursor::new(Vec::new());
            writer.write(&mut tiff, false).unwrap();

            let mut payload = b"Exif\0\0".to_vec();
            payload.extend(tiff.into_inner());
            segments.extend(app_segment(0xE1, &payload));
        }

        if !self.iptc.is_empty() {
            let mut payload = iptc::PHOTOSHOP_PREAMBLE.to_vec();
            payload.extend(iptc::encode_photoshop_resources(&self.iptc));
            segments.extend(app_segment(0xED, &payload));
        }

        let mut out = plain[..2].to_vec();
        out.extend(segments);
        out.extend_from_slice(&plain[2..]);
        out
    }
}

fn app_segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(90))
        .unwrap();
    cursor.into_inner()
}

pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([0, 90, 200]));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn iso_box(box_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(box_type);
    out.extend_from_slice(body);
    out
}

fn full_box(box_type: &[u8; 4], version: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version, 0, 0, 0];
    payload.extend_from_slice(body);
    iso_box(box_type, &payload)
}

/// A minimal HEIF container: `ftyp`, then a `meta` box holding one `ispe`
/// per extent and, when fields are given, an Exif item stored in `idat`.
/// There is no coded image data.
pub fn heif(extents: &[(u32, u32)], exif: &[Field]) -> Vec<u8> {
    let mut meta = Vec::new();

    if !exif.is_empty() {
        let mut writer = Writer::new();
        for field in exif {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();

        // Exif item payload: offset to the TIFF header, then the header
        let mut item = 0u32.to_be_bytes().to_vec();
        item.extend(tiff.into_inner());

        let mut infe = 1u16.to_be_bytes().to_vec();
        infe.extend_from_slice(&[0, 0]);
        infe.extend_from_slice(b"Exif");
        infe.push(0);
        let mut iinf = 1u16.to_be_bytes().to_vec();
        iinf.extend(full_box(b"infe", 2, &infe));
        meta.extend(full_box(b"iinf", 0, &iinf));

        // version 1, 4-byte offsets and lengths, construction method 1 (idat)
        let mut iloc = vec![0x44, 0x00];
        iloc.extend_from_slice(&1u16.to_be_bytes());
        iloc.extend_from_slice(&1u16.to_be_bytes());
        iloc.extend_from_slice(&[0, 1]);
        iloc.extend_from_slice(&0u16.to_be_bytes());
        iloc.extend_from_slice(&1u16.to_be_bytes());
        iloc.extend_from_slice(&0u32.to_be_bytes());
        iloc.extend_from_slice(&(item.len() as u32).to_be_bytes());
        meta.extend(full_box(b"iloc", 1, &iloc));
        meta.extend(iso_box(b"idat", &item));
    }

    let mut ipco = Vec::new();
    for (width, height) in extents {
        let mut ispe = width.to_be_bytes().to_vec();
        ispe.extend_from_slice(&height.to_be_bytes());
        ipco.extend(full_box(b"ispe", 0, &ispe));
    }
    meta.extend(iso_box(b"iprp", &iso_box(b"ipco", &ipco)));

    let mut out = iso_box(b"ftyp", b"heic\0\0\0\0mif1heic");
    out.extend(full_box(b"meta", 0, &meta));
    out
}

/// A tiny JPEG suitable as an embedded thumbnail.
pub fn thumbnail_bytes() -> Vec<u8> {
    encode_jpeg(16, 12)
}

// ---------------------------------------------------------------------------
// In-memory search cluster

#[derive(Default)]
struct ClusterState {
    indices: BTreeMap<String, BTreeMap<String, Json>>,
    templates: BTreeMap<String, Json>,
    template_responses: HashMap<String, Json>,
    next_id: u64,
}

/// Shared state of a fake cluster; every connection sees the same data.
/// Queries are not interpreted: every search matches all documents, in id
/// order.
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> InMemoryConnector {
        InMemoryConnector {
            cluster: self.clone(),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn backend(&self) -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend {
            cluster: self.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Aggregations returned when the template is run.
    pub fn set_template_response(&self, template_id: &str, aggregations: Json) {
        self.state
            .lock()
            .unwrap()
            .template_responses
            .insert(template_id.to_string(), aggregations);
    }

    pub fn template_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().templates.keys().cloned().collect()
    }
}

pub struct InMemoryConnector {
    cluster: InMemoryCluster,
    connections: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn connections(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connections)
    }
}

impl Connector for InMemoryConnector {
    fn endpoint(&self) -> String {
        "memory://cluster".to_string()
    }

    fn connect(&self) -> Result<Arc<dyn SearchBackend>, AppError> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(self.cluster.backend())
    }
}

pub struct InMemoryBackend {
    cluster: InMemoryCluster,
    closed: AtomicBool,
}

fn not_found(index: &str) -> AppError {
    AppError::Backend {
        status: 404,
        reason: format!("no such index [{}]", index),
    }
}

impl InMemoryBackend {
    fn state(&self) -> Result<std::sync::MutexGuard<'_, ClusterState>, AppError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::ConnectionClosed);
        }
        Ok(self.cluster.state.lock().unwrap())
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn ping(&self) -> Result<bool, AppError> {
        self.state().map(|_| true)
    }

    async fn create_index(&self, index: &str, _mapping: Option<&Json>) -> Result<(), AppError> {
        let mut state = self.state()?;
        if state.indices.contains_key(index) {
            return Err(AppError::Backend {
                status: 400,
                reason: format!("index [{}] already exists", index),
            });
        }
        state.indices.insert(index.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        Ok(self.state()?.indices.contains_key(index))
    }

    async fn delete_index(&self, index: &str) -> Result<(), AppError> {
        self.state()?
            .indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| not_found(index))
    }

    async fn refresh_index(&self, index: &str) -> Result<(), AppError> {
        match self.state()?.indices.contains_key(index) {
            true => Ok(()),
            false => Err(not_found(index)),
        }
    }

    async fn put_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Json,
        allow_update: bool,
    ) -> Result<String, AppError> {
        let mut state = self.state()?;
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                state.next_id += 1;
                format!("auto-{}", state.next_id)
            }
        };
        let documents = state.indices.entry(index.to_string()).or_default();
        if !allow_update && documents.contains_key(&id) {
            return Err(AppError::DocumentAlreadyExists {
                id,
                index: index.to_string(),
            });
        }
        documents.insert(id.clone(), document);
        Ok(id)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Json>, AppError> {
        let state = self.state()?;
        let documents = state.indices.get(index).ok_or_else(|| not_found(index))?;
        Ok(documents.get(id).cloned())
    }

    async fn count(&self, index: &str) -> Result<u64, AppError> {
        let state = self.state()?;
        let documents = state.indices.get(index).ok_or_else(|| not_found(index))?;
        Ok(documents.len() as u64)
    }

    async fn search(
        &self,
        index: &str,
        _query: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, AppError> {
        let state = self.state()?;
        let documents = state.indices.get(index).ok_or_else(|| not_found(index))?;
        Ok(SearchHits {
            total: documents.len() as u64,
            sources: documents.values().skip(from).take(size).cloned().collect(),
        })
    }

    async fn search_template(&self, index: &str, template_id: &str) -> Result<Json, AppError> {
        let state = self.state()?;
        if !state.indices.contains_key(index) {
            return Err(not_found(index));
        }
        if !state.templates.contains_key(template_id) {
            return Err(AppError::Backend {
                status: 404,
                reason: format!("unable to find script [{}]", template_id),
            });
        }
        Ok(state
            .template_responses
            .get(template_id)
            .cloned()
            .unwrap_or(Json::Null))
    }

    async fn put_search_template(&self, id: &str, source: &Json) -> Result<(), AppError> {
        self.state()?.templates.insert(id.to_string(), source.clone());
        Ok(())
    }

    async fn search_template_exists(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.state()?.templates.contains_key(id))
    }

    async fn delete_search_template(&self, id: &str) -> Result<(), AppError> {
        self.state()?.templates.remove(id);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
