// Synthetic nda byte buffers and records for unit tests
use byteorder::{LittleEndian, WriteBytesExt};
use time::macros::datetime;
use time::{Duration, PrimitiveDateTime};

use crate::constants::*;
use crate::record::{Record, StepName, StreamKind};

/// Header length of the synthetic files; anything past the last field is padding
pub const HEADER_SIZE: usize = 2600;

#[derive(Debug, Clone)]
pub struct HeaderFixture {
    pub active_mass_ug: u32,
    pub current_limit: i32,
    pub machine_id: u8,
    pub row_id: u8,
    pub channel_id: u8,
    pub creator: String,
    pub comment: String,
    pub barcode: String,
    pub step_file: String,
}

impl Default for HeaderFixture {
    fn default() -> Self {
        Self {
            active_mass_ug: 2_500_000,
            current_limit: 6000,
            machine_id: 1,
            row_id: 1,
            channel_id: 1,
            creator: String::new(),
            comment: String::new(),
            barcode: String::new(),
            step_file: String::new(),
        }
    }
}

impl HeaderFixture {
    /// The header region, without the delimiter
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[ACTIVE_MASS_RANGE.0..ACTIVE_MASS_RANGE.1]
            .copy_from_slice(&self.active_mass_ug.to_le_bytes());
        bytes[CURRENT_LIMIT_RANGE.0..CURRENT_LIMIT_RANGE.1]
            .copy_from_slice(&self.current_limit.to_le_bytes());
        bytes[MACHINE_ID_OFFSET] = self.machine_id;
        bytes[ROW_ID_OFFSET] = self.row_id;
        bytes[CHANNEL_ID_OFFSET] = self.channel_id;
        plant_text(&mut bytes, CREATOR_RANGE, &self.creator);
        plant_text(&mut bytes, COMMENT_RANGE, &self.comment);
        plant_text(&mut bytes, BARCODE_RANGE, &self.barcode);
        plant_text(&mut bytes, STEP_FILE_RANGE, &self.step_file);
        bytes
    }
}

fn plant_text(bytes: &mut [u8], range: (usize, usize), text: &str) {
    assert!(text.len() <= range.1 - range.0);
    bytes[range.0..range.0 + text.len()].copy_from_slice(text.as_bytes());
}

#[derive(Debug, Clone)]
pub struct RecordFixture {
    pub aux_indicator: i16,
    pub record_raw: i32,
    pub cycle_raw: i32,
    pub step_method: i16,
    pub step_name_raw: i8,
    pub step_raw: i8,
    pub step_time_ms: i64,
    pub voltage: i32,
    pub current: i32,
    pub temperature: i32,
    pub capacity_chg: i64,
    pub capacity_dchg: i64,
    pub energy_chg: i64,
    pub energy_dchg: i64,
    pub timestamp: PrimitiveDateTime,
    pub current_range: i32,
}

impl Default for RecordFixture {
    fn default() -> Self {
        Self {
            aux_indicator: PRIMARY_INDICATOR,
            record_raw: 1,
            cycle_raw: 1,
            step_method: 1,
            step_name_raw: 4,
            step_raw: 1,
            step_time_ms: 0,
            voltage: 30_000,
            current: 0,
            temperature: 250,
            capacity_chg: 0,
            capacity_dchg: 0,
            energy_chg: 0,
            energy_dchg: 0,
            timestamp: datetime!(2021-03-14 09:26:00),
            current_range: 100,
        }
    }
}

impl RecordFixture {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        self.write(&mut bytes).expect("writes to a Vec do not fail");
        bytes
    }

    fn write(&self, bytes: &mut Vec<u8>) -> std::io::Result<()> {
        bytes.write_i16::<LittleEndian>(self.aux_indicator)?;
        bytes.write_i32::<LittleEndian>(self.record_raw)?;
        bytes.write_i32::<LittleEndian>(self.cycle_raw)?;
        bytes.write_i16::<LittleEndian>(self.step_method)?;
        bytes.write_i8(self.step_name_raw)?;
        bytes.write_i8(self.step_raw)?;
        bytes.write_i64::<LittleEndian>(self.step_time_ms)?;
        bytes.write_i32::<LittleEndian>(self.voltage)?;
        bytes.write_i32::<LittleEndian>(self.current)?;
        bytes.write_i32::<LittleEndian>(0)?;
        bytes.write_i32::<LittleEndian>(self.temperature)?;
        bytes.write_i64::<LittleEndian>(self.capacity_chg)?;
        bytes.write_i64::<LittleEndian>(self.capacity_dchg)?;
        bytes.write_i64::<LittleEndian>(self.energy_chg)?;
        bytes.write_i64::<LittleEndian>(self.energy_dchg)?;
        bytes.write_i16::<LittleEndian>(self.timestamp.year() as i16)?;
        bytes.write_i8(u8::from(self.timestamp.month()) as i8)?;
        bytes.write_i8(self.timestamp.day() as i8)?;
        bytes.write_i8(self.timestamp.hour() as i8)?;
        bytes.write_i8(self.timestamp.minute() as i8)?;
        bytes.write_i16::<LittleEndian>(self.timestamp.second() as i16)?;
        bytes.write_i32::<LittleEndian>(self.current_range)?;
        bytes.write_i32::<LittleEndian>(0)?;
        Ok(())
    }
}

/// A complete file: header, then the records back to back.
///
/// The first record should be primary record number 1 so that it doubles as the delimiter.
pub fn file_bytes(header: &HeaderFixture, records: &[RecordFixture]) -> Vec<u8> {
    let mut bytes = header.to_bytes();
    for record in records {
        bytes.extend(record.to_bytes());
    }
    bytes
}

/// Primary records numbered from 1, one second apart, one per (step method, step name code)
pub fn primary_run(start: PrimitiveDateTime, steps: &[(i16, i8)]) -> Vec<RecordFixture> {
    steps
        .iter()
        .enumerate()
        .map(|(idx, (method, name))| RecordFixture {
            record_raw: idx as i32 + 1,
            step_method: *method,
            step_name_raw: *name,
            timestamp: start + Duration::seconds(idx as i64),
            ..Default::default()
        })
        .collect()
}

/// A physical record with neutral values
pub fn record(stream: StreamKind, record_raw: i32, step_method: i16) -> Record {
    Record {
        record_id: 0,
        step_id: 0,
        cycle_id: None,
        step_name: StepName::Rest,
        step_method,
        step_time_s: 0.0,
        voltage_v: 3.0,
        current_a: 0.0,
        temperature_c: 25.0,
        capacity_chg_ah: 0.0,
        capacity_dchg_ah: 0.0,
        energy_chg_wh: 0.0,
        energy_dchg_wh: 0.0,
        timestamp: datetime!(2021-03-14 09:26:00) + Duration::seconds(record_raw as i64),
        record_raw,
        cycle_raw: 1,
        step_raw: 1,
        current_range: 100,
        stream,
        source_file: 0,
    }
}
