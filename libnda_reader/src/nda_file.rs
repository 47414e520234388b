use std::path::{Path, PathBuf};

use super::error::NdaFileError;
use super::header::{find_header_size, FileMetadata};
use super::record::decode_records;
use super::scale::CurrentLimit;
use super::step::StepBoundaryPolicy;
use super::stream::Streams;

/// A fully decoded nda file.
///
/// The whole file is read into memory and decoded in one pass. The primary stream is
/// already segmented into steps; the auxiliary stream shares those steps.
#[derive(Debug, Clone)]
pub struct NdaFile {
    pub path: PathBuf,
    pub metadata: FileMetadata,
    pub streams: Streams,
}

impl NdaFile {
    /// Open and decode the file at path
    pub fn open(path: &Path) -> Result<Self, NdaFileError> {
        if !path.exists() {
            return Err(NdaFileError::BadFilePath(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        log::info!(
            "Decoding {} ({})",
            path.display(),
            human_bytes::human_bytes(bytes.len() as f64)
        );
        let (metadata, streams) = decode_bytes(&bytes)?;
        log::info!(
            "Decoded {} primary and {} auxiliary records from {}",
            streams.primary.len(),
            streams.auxiliary.as_ref().map_or(0, |aux| aux.len()),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            streams,
        })
    }

    /// The file name, used as the name of the file's entry in a Dataset
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned()
    }
}

/// Decode the raw contents of an nda file into its metadata and segmented streams
pub fn decode_bytes(bytes: &[u8]) -> Result<(FileMetadata, Streams), NdaFileError> {
    let header_size = find_header_size(bytes)?;
    let metadata = FileMetadata::from_header(&bytes[..header_size])?;
    let limit = CurrentLimit::try_from(metadata.current_limit)?;
    let raws = decode_records(&bytes[header_size..])?;
    // A single file has no file boundaries, so the policy makes no difference here
    let streams =
        Streams::split(&raws, limit, header_size)?.segmented(StepBoundaryPolicy::default());
    let metadata = metadata.with_bounds(&streams.primary);
    Ok((metadata, streams))
}
