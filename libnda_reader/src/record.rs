use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::io::Cursor;
use time::{Date, Month, PrimitiveDateTime, Time};

use super::constants::*;
use super::error::FormatError;
use super::scale::CurrentLimit;

/// A record exactly as it is laid out in the body of an nda file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub aux_indicator: i16,
    pub record_raw: i32,
    pub cycle_raw: i32,
    pub step_method: i16,
    pub step_name_raw: i8,
    pub step_raw: i8,
    pub step_time_ms: i64,
    pub voltage: i32,
    pub current: i32,
    pub column_1: i32,
    pub temperature: i32,
    pub capacity_chg: i64,
    pub capacity_dchg: i64,
    pub energy_chg: i64,
    pub energy_dchg: i64,
    pub year: i16,
    pub month: i8,
    pub day: i8,
    pub hour: i8,
    pub minute: i8,
    pub second: i16,
    pub current_range: i32,
    pub column_2: i32,
}

impl RawRecord {
    /// Read a single record from the cursor. The cursor must hold at least RECORD_SIZE bytes.
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, std::io::Error> {
        Ok(Self {
            aux_indicator: cursor.read_i16::<LittleEndian>()?,
            record_raw: cursor.read_i32::<LittleEndian>()?,
            cycle_raw: cursor.read_i32::<LittleEndian>()?,
            step_method: cursor.read_i16::<LittleEndian>()?,
            step_name_raw: cursor.read_i8()?,
            step_raw: cursor.read_i8()?,
            step_time_ms: cursor.read_i64::<LittleEndian>()?,
            voltage: cursor.read_i32::<LittleEndian>()?,
            current: cursor.read_i32::<LittleEndian>()?,
            column_1: cursor.read_i32::<LittleEndian>()?,
            temperature: cursor.read_i32::<LittleEndian>()?,
            capacity_chg: cursor.read_i64::<LittleEndian>()?,
            capacity_dchg: cursor.read_i64::<LittleEndian>()?,
            energy_chg: cursor.read_i64::<LittleEndian>()?,
            energy_dchg: cursor.read_i64::<LittleEndian>()?,
            year: cursor.read_i16::<LittleEndian>()?,
            month: cursor.read_i8()?,
            day: cursor.read_i8()?,
            hour: cursor.read_i8()?,
            minute: cursor.read_i8()?,
            second: cursor.read_i16::<LittleEndian>()?,
            current_range: cursor.read_i32::<LittleEndian>()?,
            column_2: cursor.read_i32::<LittleEndian>()?,
        })
    }

    /// Compose the calendar timestamp of the record.
    ///
    /// Negative or oversized fields are mapped to values the calendar rejects.
    pub fn timestamp(&self) -> Result<PrimitiveDateTime, time::error::ComponentRange> {
        let narrow = |value: i16| u8::try_from(value).unwrap_or(u8::MAX);
        let month = Month::try_from(u8::try_from(self.month).unwrap_or(0))?;
        let date = Date::from_calendar_date(self.year as i32, month, narrow(self.day as i16))?;
        let time = Time::from_hms(
            narrow(self.hour as i16),
            narrow(self.minute as i16),
            narrow(self.second),
        )?;
        Ok(PrimitiveDateTime::new(date, time))
    }
}

/// Interpret the body of an nda file as an array of raw records
pub fn decode_records(body: &[u8]) -> Result<Vec<RawRecord>, FormatError> {
    if body.len() % RECORD_SIZE != 0 {
        return Err(FormatError::BadBodyLength(body.len()));
    }
    let n_records = body.len() / RECORD_SIZE;
    let mut cursor = Cursor::new(body);
    let mut records = Vec::with_capacity(n_records);
    for _ in 0..n_records {
        // Length is checked above; a read can only fail on a short buffer
        let record =
            RawRecord::read(&mut cursor).map_err(|_| FormatError::BadBodyLength(body.len()))?;
        records.push(record);
    }
    Ok(records)
}

/// Symbolic name of a step, decoded from the raw step-name code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepName {
    CcChg,
    CcDchg,
    Rest,
    CccvChg,
    /// Codes 3, 5, 6, 8 and 9 have no symbolic name and are reported by their number
    Numbered(u8),
    Unknown,
}

impl StepName {
    pub fn from_code(code: i8) -> Self {
        match code {
            1 => Self::CcChg,
            2 => Self::CcDchg,
            4 => Self::Rest,
            7 => Self::CccvChg,
            3 | 5 | 6 | 8 | 9 => Self::Numbered(code as u8),
            _ => Self::Unknown,
        }
    }

    pub fn is_charge(&self) -> bool {
        matches!(self, Self::CcChg | Self::CccvChg)
    }

    pub fn is_discharge(&self) -> bool {
        matches!(self, Self::CcDchg)
    }
}

impl Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CcChg => write!(f, "CC_Chg"),
            Self::CcDchg => write!(f, "CC_Dchg"),
            Self::Rest => write!(f, "Rest"),
            Self::CccvChg => write!(f, "CCCV_Chg"),
            Self::Numbered(code) => write!(f, "{code}"),
            Self::Unknown => write!(f, "0"),
        }
    }
}

impl Serialize for StepName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which of the two record streams of a file a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamKind {
    Primary,
    Auxiliary,
}

impl StreamKind {
    pub fn from_indicator(indicator: i16) -> Option<Self> {
        match indicator {
            PRIMARY_INDICATOR => Some(Self::Primary),
            AUXILIARY_INDICATOR => Some(Self::Auxiliary),
            _ => None,
        }
    }
}

/// A record converted to physical units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub record_id: u32,
    pub step_id: u32,
    pub cycle_id: Option<u32>,
    pub step_name: StepName,
    pub step_method: i16,
    pub step_time_s: f64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub capacity_chg_ah: f64,
    pub capacity_dchg_ah: f64,
    pub energy_chg_wh: f64,
    pub energy_dchg_wh: f64,
    #[serde(with = "timestamp_format")]
    pub timestamp: PrimitiveDateTime,
    pub record_raw: i32,
    pub cycle_raw: i32,
    pub step_raw: i8,
    pub current_range: i32,
    pub stream: StreamKind,
    /// Position of the originating file within a merged table; 0 for a single file
    pub source_file: u32,
}

impl Record {
    /// Convert a raw record. `index` is the position of the record in the file body and
    /// `body_start` the file offset of the body; both are only used to locate errors.
    /// Ids are left at 0 until the stream is sequenced.
    pub fn from_raw(
        raw: &RawRecord,
        stream: StreamKind,
        limit: CurrentLimit,
        index: usize,
        body_start: usize,
    ) -> Result<Self, FormatError> {
        let timestamp = raw
            .timestamp()
            .map_err(|source| FormatError::InvalidTimestamp {
                record: index,
                offset: body_start + index * RECORD_SIZE + RECORD_DATE_OFFSET,
                source,
            })?;
        let factor = limit.current_factor(raw.current_range);
        let accumulated = factor * SECONDS_PER_HOUR;
        Ok(Self {
            record_id: 0,
            step_id: 0,
            cycle_id: None,
            step_name: StepName::from_code(raw.step_name_raw),
            step_method: raw.step_method,
            step_time_s: raw.step_time_ms as f64 / STEP_TIME_DIVISOR,
            voltage_v: raw.voltage as f64 / VOLTAGE_DIVISOR,
            current_a: raw.current as f64 / factor,
            temperature_c: raw.temperature as f64 / TEMPERATURE_DIVISOR,
            capacity_chg_ah: raw.capacity_chg as f64 / accumulated,
            capacity_dchg_ah: raw.capacity_dchg as f64 / accumulated,
            energy_chg_wh: raw.energy_chg as f64 / accumulated,
            energy_dchg_wh: raw.energy_dchg as f64 / accumulated,
            timestamp,
            record_raw: raw.record_raw,
            cycle_raw: raw.cycle_raw,
            step_raw: raw.step_raw,
            current_range: raw.current_range,
            stream,
            source_file: 0,
        })
    }
}

/// An ordered table of records of one stream.
///
/// Tables are snapshots; every derivation returns a new table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordTable {
    rows: Vec<Record>,
}

impl RecordTable {
    /// Wrap rows that are already in sequence order
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Assign record ids 1..=n in the current row order
    pub fn sequenced(mut self) -> Self {
        for (idx, row) in self.rows.iter_mut().enumerate() {
            row.record_id = idx as u32 + 1;
        }
        self
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<PrimitiveDateTime> {
        self.rows.first().map(|r| r.timestamp)
    }

    /// Copy of the table with step ids replaced by `step_ids` (one per row)
    pub fn with_step_ids(&self, step_ids: &[u32]) -> Self {
        let mut rows = self.rows.clone();
        for (row, step_id) in rows.iter_mut().zip(step_ids) {
            row.step_id = *step_id;
        }
        Self { rows }
    }

    /// Copy of the table with the cycle of each row looked up from its step.
    ///
    /// `cycle_of_step[i]` is the cycle of step id `i + 1`.
    pub fn with_cycle_ids(&self, cycle_of_step: &[u32]) -> Self {
        let mut rows = self.rows.clone();
        for row in rows.iter_mut() {
            row.cycle_id = (row.step_id as usize)
                .checked_sub(1)
                .and_then(|idx| cycle_of_step.get(idx))
                .copied();
        }
        Self { rows }
    }
}

/// Timestamps are written as `YYYY-MM-DD hh:mm:ss`
pub(crate) mod timestamp_format {
    use serde::Serializer;
    use time::macros::format_description;
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(
        value: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let text = value.format(format).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}
