use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use super::constants::*;
use super::error::FormatError;
use super::record::RecordTable;

/// Find the size of the header, which is the offset of the first delimiter
pub fn find_header_size(bytes: &[u8]) -> Result<usize, FormatError> {
    bytes
        .windows(HEADER_DELIMITER.len())
        .position(|window| window == HEADER_DELIMITER)
        .ok_or(FormatError::MissingDelimiter)
}

/// A single scalar of the metadata table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

/// Metadata of a single nda file.
///
/// The fixed fields come from the header. The bounds (capacity_max_ah and the voltage
/// limits) are observed from the primary records after decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub active_mass_g: f64,
    pub comment: String,
    pub creator: String,
    pub barcode: String,
    pub step_file: String,
    pub current_limit: u32,
    pub machine_id: u8,
    pub row_id: u8,
    pub channel_id: u8,
    pub capacity_max_ah: Option<f64>,
    pub voltage_upper_limit: Option<f64>,
    pub voltage_lower_limit: Option<f64>,
}

impl FileMetadata {
    /// Decode the header region (everything before the delimiter)
    pub fn from_header(header: &[u8]) -> Result<Self, FormatError> {
        if header.len() < MIN_HEADER_SIZE {
            return Err(FormatError::TruncatedHeader(header.len()));
        }

        let mass_raw = LittleEndian::read_u32(&header[ACTIVE_MASS_RANGE.0..ACTIVE_MASS_RANGE.1]);
        let limit_raw =
            LittleEndian::read_i32(&header[CURRENT_LIMIT_RANGE.0..CURRENT_LIMIT_RANGE.1]);

        Ok(Self {
            active_mass_g: mass_raw as f64 / ACTIVE_MASS_DIVISOR,
            comment: read_text(header, COMMENT_RANGE, "comment")?,
            creator: read_text(header, CREATOR_RANGE, "creator")?,
            barcode: read_text(header, BARCODE_RANGE, "barcode")?,
            step_file: read_text(header, STEP_FILE_RANGE, "step_file")?,
            current_limit: limit_raw.unsigned_abs(),
            machine_id: header[MACHINE_ID_OFFSET],
            row_id: header[ROW_ID_OFFSET],
            channel_id: header[CHANNEL_ID_OFFSET],
            capacity_max_ah: None,
            voltage_upper_limit: None,
            voltage_lower_limit: None,
        })
    }

    /// Copy of this metadata with the bounds observed in the given primary records
    pub fn with_bounds(&self, records: &RecordTable) -> Self {
        let rows = records.rows();
        let voltages = || rows.iter().map(|r| r.voltage_v);
        Self {
            capacity_max_ah: rows.iter().map(|r| r.capacity_dchg_ah).reduce(f64::max),
            voltage_upper_limit: voltages().reduce(f64::max),
            voltage_lower_limit: voltages().reduce(f64::min),
            ..self.clone()
        }
    }

    /// The metadata as an ordered key-value table
    pub fn table(&self) -> Vec<(&'static str, MetaValue)> {
        let opt = |value: Option<f64>| value.map_or(MetaValue::Missing, MetaValue::Float);
        vec![
            ("active_mass_g", MetaValue::Float(self.active_mass_g)),
            ("comment", MetaValue::Text(self.comment.clone())),
            ("creator", MetaValue::Text(self.creator.clone())),
            ("barcode", MetaValue::Text(self.barcode.clone())),
            ("step_file", MetaValue::Text(self.step_file.clone())),
            ("current_limit", MetaValue::Int(self.current_limit as i64)),
            ("machine_id", MetaValue::Int(self.machine_id as i64)),
            ("row_id", MetaValue::Int(self.row_id as i64)),
            ("channel_id", MetaValue::Int(self.channel_id as i64)),
            ("capacity_max_Ah", opt(self.capacity_max_ah)),
            ("voltage_upper_limit", opt(self.voltage_upper_limit)),
            ("voltage_lower_limit", opt(self.voltage_lower_limit)),
        ]
    }

    /// Channel identifier in the machine_row_channel form used by the instrument software
    pub fn channel_name(&self) -> String {
        format!("{}_{}_{}", self.machine_id, self.row_id, self.channel_id)
    }
}

/// Read a NUL padded UTF-8 string
fn read_text(
    header: &[u8],
    range: (usize, usize),
    field: &'static str,
) -> Result<String, FormatError> {
    let raw = &header[range.0..range.1];
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |idx| idx + 1);
    std::str::from_utf8(&raw[..end])
        .map(String::from)
        .map_err(|_| FormatError::InvalidText {
            field,
            offset: range.0,
        })
}
