use std::path::PathBuf;
use thiserror::Error;

use super::constants::{MIN_HEADER_SIZE, RECORD_SIZE};
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, Error)]
pub enum FormatError {
    #[error("Could not find the header delimiter 0x55 0x00 0x01 in the nda file")]
    MissingDelimiter,
    #[error("Header of the nda file is {0} bytes; expected at least {min}", min=MIN_HEADER_SIZE)]
    TruncatedHeader(usize),
    #[error("Header field {field} at byte offset {offset} is not valid UTF-8")]
    InvalidText { field: &'static str, offset: usize },
    #[error("Body of the nda file is {0} bytes, which is not a multiple of the record size {size}", size=RECORD_SIZE)]
    BadBodyLength(usize),
    #[error("Record {record} at file byte offset {offset} has an invalid date/time: {source}")]
    InvalidTimestamp {
        record: usize,
        offset: usize,
        source: time::error::ComponentRange,
    },
}

#[derive(Debug, Clone, Error)]
pub enum ScaleError {
    #[error("Current limit class {0} does not match any known scale table; expected one of 10, 6000, 50000, 100000")]
    UnknownCurrentLimit(u32),
}

#[derive(Debug, Error)]
pub enum NdaFileError {
    #[error("Could not open nda file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("NdaFile failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("NdaFile has a malformed layout: {0}")]
    Format(#[from] FormatError),
    #[error("NdaFile could not be scaled: {0}")]
    Scale(#[from] ScaleError),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset failed to decode file {path:?}: {source}")]
    FileError {
        path: PathBuf,
        source: NdaFileError,
    },
    #[error("Dataset could not decode any of the {0} given files")]
    NoDecodedFiles(usize),
    #[error("Dataset refused to merge because these files failed to decode: {0:?}")]
    MergeRefused(Vec<PathBuf>),
    #[error("Dataset cannot order file {0} for merging because it has no primary records")]
    EmptyPrimaryStream(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Dataset error: {0}")]
    DatasetError(#[from] DatasetError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor was given an invalid number of threads: {0}")]
    BadThreadCount(i32),
    #[error("Processor failed due to a worker thread panicking")]
    WorkerPanic,
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed to write summary YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
