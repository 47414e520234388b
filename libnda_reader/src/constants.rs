// Layout of the .nda file. All offsets are in bytes from the start of the file.

/// Marks the end of the header. It is also the start of the first primary record
/// (indicator 85 followed by the low byte of record number 1).
pub const HEADER_DELIMITER: [u8; 3] = [0x55, 0x00, 0x01];

pub const ACTIVE_MASS_RANGE: (usize, usize) = (152, 156);
pub const CURRENT_LIMIT_RANGE: (usize, usize) = (2074, 2078);
pub const MACHINE_ID_OFFSET: usize = 2090;
pub const ROW_ID_OFFSET: usize = 2091;
pub const CHANNEL_ID_OFFSET: usize = 2092;
pub const CREATOR_RANGE: (usize, usize) = (2167, 2225);
pub const COMMENT_RANGE: (usize, usize) = (2317, 2414);
pub const BARCODE_RANGE: (usize, usize) = (2433, 2454);
pub const STEP_FILE_RANGE: (usize, usize) = (2533, 2592);
/// The header must reach at least the end of the last fixed field
pub const MIN_HEADER_SIZE: usize = STEP_FILE_RANGE.1;

/// Active mass is stored in micrograms
pub const ACTIVE_MASS_DIVISOR: f64 = 1_000_000.0;

/// Size of a single record in the body
pub const RECORD_SIZE: usize = 86;
/// Offset of the year field within a record
pub const RECORD_DATE_OFFSET: usize = 70;

pub const PRIMARY_INDICATOR: i16 = 85;
pub const AUXILIARY_INDICATOR: i16 = 357;

pub const VOLTAGE_DIVISOR: f64 = 10_000.0;
pub const TEMPERATURE_DIVISOR: f64 = 10.0;
pub const STEP_TIME_DIVISOR: f64 = 1_000.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Name given to the merged entry of a Dataset
pub const MERGED_ENTRY_NAME: &str = "merged_data";

// Table names of a Dataset entry
pub const META_TABLE: &str = "meta_data";
pub const RAW_TABLE: &str = "raw_data";
pub const AUX_TABLE: &str = "auxt_data";
pub const STEP_TABLE: &str = "step_data";
pub const CYCLE_TABLE: &str = "cycle_data";
