//! IPTC-IIM records carried by the Photoshop image resource block of JPEG
//! APP13 segments.

use crate::error::AppError;

pub const PHOTOSHOP_PREAMBLE: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;
const TAG_MARKER: u8 = 0x1C;

// Envelope record
const ENVELOPE_RECORD: u8 = 1;
const CODED_CHARACTER_SET: u8 = 90;

// Application record
pub const APPLICATION_RECORD: u8 = 2;
pub const OBJECT_NAME: u8 = 5;
pub const KEYWORDS: u8 = 25;
pub const CITY: u8 = 90;
pub const SUB_LOCATION: u8 = 92;
pub const PROVINCE_OR_STATE: u8 = 95;
pub const COUNTRY_CODE: u8 = 100;
pub const COUNTRY_NAME: u8 = 101;
pub const HEADLINE: u8 = 105;
pub const CAPTION: u8 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    pub record: u8,
    pub number: u8,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct IptcDirectory {
    datasets: Vec<DataSet>,
}

impl IptcDirectory {
    /// Decodes the IPTC stream found in a Photoshop image resource block
    /// (the APP13 payload, preamble already stripped).
    pub fn from_photoshop_resources(data: &[u8]) -> Result<Option<Self>, AppError> {
        let mut directory = None;
        let mut pos = 0;

        while pos + 12 <= data.len() {
            if &data[pos..pos + 4] != RESOURCE_SIGNATURE {
                return Err(AppError::corrupt("IPTC", "invalid image resource signature"));
            }
            let id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
            pos += 6;

            // Pascal string name, padded so that length byte + name is even
            let name_len = data[pos] as usize;
            pos += name_len + 1;
            if (name_len + 1) % 2 != 0 {
                pos += 1;
            }

            let size_bytes = data
                .get(pos..pos + 4)
                .ok_or_else(|| AppError::corrupt("IPTC", "truncated image resource header"))?;
            let size = u32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
                as usize;
            pos += 4;

            let resource = data
                .get(pos..pos + size)
                .ok_or_else(|| AppError::corrupt("IPTC", "truncated image resource"))?;
            if id == IPTC_RESOURCE_ID {
                let parsed = Self::parse(resource)?;
                directory
                    .get_or_insert_with(IptcDirectory::default)
                    .datasets
                    .extend(parsed.datasets);
            }

            pos += size + size % 2;
        }

        Ok(directory)
    }

    /// Parses a raw IPTC-IIM stream.
    pub fn parse(data: &[u8]) -> Result<Self, AppError> {
        let mut datasets = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            if data[pos] != TAG_MARKER {
                // Trailing padding is common, anything after it is ignored
                log::trace!("IPTC stream ends at offset {} (byte {:#04x})", pos, data[pos]);
                break;
            }
            let header = data
                .get(pos + 1..pos + 5)
                .ok_or_else(|| AppError::corrupt("IPTC", "truncated dataset header"))?;
            let record = header[0];
            let number = header[1];
            let mut len = u16::from_be_bytes([header[2], header[3]]) as usize;
            pos += 5;

            if len & 0x8000 != 0 {
                // Extended dataset: the low bits give the size of the length field
                let count = len & 0x7FFF;
                let bytes = data
                    .get(pos..pos + count)
                    .filter(|b| b.len() <= 4)
                    .ok_or_else(|| AppError::corrupt("IPTC", "invalid extended dataset length"))?;
                len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
                pos += count;
            }

            let value = data
                .get(pos..pos + len)
                .ok_or_else(|| AppError::corrupt("IPTC", "truncated dataset"))?;
            datasets.push(DataSet {
                record,
                number,
                value: value.to_vec(),
            });
            pos += len;
        }

        Ok(Self { datasets })
    }

    pub fn datasets(&self) -> &[DataSet] {
        &self.datasets
    }

    fn is_utf8(&self) -> bool {
        // ESC % G
        self.datasets.iter().any(|d| {
            d.record == ENVELOPE_RECORD && d.number == CODED_CHARACTER_SET && d.value == b"\x1b%G"
        })
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let text = if self.is_utf8() {
            String::from_utf8_lossy(bytes).into_owned()
        } else {
            match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                // ISO 8859-1 maps one-to-one onto the first 256 code points
                Err(_) => bytes.iter().map(|&b| b as char).collect(),
            }
        };
        text.trim_end_matches('\0').trim().to_string()
    }

    /// First value of an application record dataset.
    pub fn string(&self, number: u8) -> Option<String> {
        self.datasets
            .iter()
            .find(|d| d.record == APPLICATION_RECORD && d.number == number)
            .map(|d| self.decode(&d.value))
            .filter(|s| !s.is_empty())
    }

    /// All values of a repeatable application record dataset.
    pub fn strings(&self, number: u8) -> Vec<String> {
        self.datasets
            .iter()
            .filter(|d| d.record == APPLICATION_RECORD && d.number == number)
            .map(|d| self.decode(&d.value))
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn country_code(&self) -> Option<String> {
        self.string(COUNTRY_CODE)
    }

    pub fn country(&self) -> Option<String> {
        self.string(COUNTRY_NAME)
    }

    pub fn province_or_state(&self) -> Option<String> {
        self.string(PROVINCE_OR_STATE)
    }

    pub fn city(&self) -> Option<String> {
        self.string(CITY)
    }

    pub fn sublocation(&self) -> Option<String> {
        self.string(SUB_LOCATION)
    }

    pub fn caption(&self) -> Option<String> {
        self.string(CAPTION)
    }

    pub fn object_name(&self) -> Option<String> {
        self.string(OBJECT_NAME)
    }

    pub fn headline(&self) -> Option<String> {
        self.string(HEADLINE)
    }

    pub fn keywords(&self) -> Vec<String> {
        self.strings(KEYWORDS)
    }
}

/// Builds a Photoshop resource block wrapping the given IPTC datasets.
/// Counterpart of [`IptcDirectory::from_photoshop_resources`], used to
/// produce APP13 payloads.
pub fn encode_photoshop_resources(datasets: &[DataSet]) -> Vec<u8> {
    let mut iptc = Vec::new();
    for dataset in datasets {
        iptc.push(TAG_MARKER);
        iptc.push(dataset.record);
        iptc.push(dataset.number);
        iptc.extend_from_slice(&(dataset.value.len() as u16).to_be_bytes());
        iptc.extend_from_slice(&dataset.value);
    }

    let mut block = Vec::new();
    block.extend_from_slice(RESOURCE_SIGNATURE);
    block.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
    block.extend_from_slice(&[0, 0]);
    block.extend_from_slice(&(iptc.len() as u32).to_be_bytes());
    block.extend_from_slice(&iptc);
    if iptc.len() % 2 != 0 {
        block.push(0);
    }
    block
}
