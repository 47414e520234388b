use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::constants::*;
use super::cycle::CycleTable;
use super::error::{DatasetError, NdaFileError};
use super::header::{FileMetadata, MetaValue};
use super::merge::merge_entries;
use super::nda_file::NdaFile;
use super::record::RecordTable;
use super::step::{StepBoundaryPolicy, StepTable};
use super::stream::Streams;

/// User supplied cell parameters. An unset or zero value falls back to what was decoded
/// from the last file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellOverrides {
    pub active_mass_g: Option<f64>,
    pub design_capacity_ah: Option<f64>,
    pub rated_capacity_ah: Option<f64>,
    pub voltage_upper_limit: Option<f64>,
    pub voltage_lower_limit: Option<f64>,
}

/// Cell parameters used for the analysis of every entry in a Dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellParameters {
    pub active_mass_g: f64,
    /// Largest observed discharge capacity, rounded to 0.1 Ah
    pub design_capacity_ah: Option<f64>,
    /// Largest observed discharge capacity
    pub rated_capacity_ah: Option<f64>,
    pub voltage_upper_limit: Option<f64>,
    pub voltage_lower_limit: Option<f64>,
}

impl CellParameters {
    pub fn resolve(overrides: &CellOverrides, last: &FileMetadata) -> Self {
        let design_capacity_ah = pick(
            overrides.design_capacity_ah,
            last.capacity_max_ah
                .map(|capacity| (capacity * 10.0).round() / 10.0),
        );
        Self {
            active_mass_g: pick(overrides.active_mass_g, Some(last.active_mass_g))
                .unwrap_or_default(),
            design_capacity_ah,
            rated_capacity_ah: pick(overrides.rated_capacity_ah, last.capacity_max_ah),
            voltage_upper_limit: pick(overrides.voltage_upper_limit, last.voltage_upper_limit),
            voltage_lower_limit: pick(overrides.voltage_lower_limit, last.voltage_lower_limit),
        }
    }
}

fn pick(user: Option<f64>, decoded: Option<f64>) -> Option<f64> {
    user.filter(|value| *value != 0.0).or(decoded)
}

/// One of the named tables of an entry
#[derive(Debug, Clone, PartialEq)]
pub enum Table<'a> {
    Metadata(Vec<(&'static str, MetaValue)>),
    Records(&'a RecordTable),
    Steps(&'a StepTable),
    Cycles(&'a CycleTable),
}

/// The tables of a single file, or of the merged files.
///
/// Step and cycle tables only exist once the Dataset has been analyzed.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub name: String,
    /// None for the merged entry
    pub path: Option<PathBuf>,
    pub metadata: FileMetadata,
    pub streams: Streams,
    pub steps: Option<StepTable>,
    pub cycles: Option<CycleTable>,
}

impl From<NdaFile> for DatasetEntry {
    fn from(file: NdaFile) -> Self {
        Self {
            name: file.name(),
            path: Some(file.path),
            metadata: file.metadata,
            streams: file.streams,
            steps: None,
            cycles: None,
        }
    }
}

impl DatasetEntry {
    /// Look up a table by name. Missing tables (no auxiliary stream, not analyzed yet)
    /// and unknown names give None.
    pub fn table(&self, name: &str) -> Option<Table<'_>> {
        match name {
            META_TABLE => Some(Table::Metadata(self.metadata.table())),
            RAW_TABLE => Some(Table::Records(&self.streams.primary)),
            AUX_TABLE => self.streams.auxiliary.as_ref().map(Table::Records),
            STEP_TABLE => self.steps.as_ref().map(Table::Steps),
            CYCLE_TABLE => self.cycles.as_ref().map(Table::Cycles),
            _ => None,
        }
    }

    /// Names of the tables this entry currently has
    pub fn table_names(&self) -> Vec<&'static str> {
        [META_TABLE, RAW_TABLE, AUX_TABLE, STEP_TABLE, CYCLE_TABLE]
            .into_iter()
            .filter(|name| self.table(name).is_some())
            .collect()
    }

    fn analyzed(&self, parameters: &CellParameters, add_cycle_to_records: bool) -> Self {
        let steps = StepTable::from_records(&self.streams.primary);
        let cycles = CycleTable::from_steps(
            &steps,
            parameters.rated_capacity_ah,
            parameters.active_mass_g,
        );
        let streams = if add_cycle_to_records {
            self.streams.with_cycle_ids(&steps.cycle_of_step())
        } else {
            self.streams.clone()
        };
        Self {
            name: self.name.clone(),
            path: self.path.clone(),
            metadata: self.metadata.clone(),
            streams,
            steps: Some(steps),
            cycles: Some(cycles),
        }
    }
}

/// Counts and cycle results of one entry, as written to the summary file
#[derive(Debug, Serialize)]
pub struct EntrySummary<'a> {
    pub name: &'a str,
    pub metadata: &'a FileMetadata,
    pub n_records: usize,
    pub n_auxiliary_records: Option<usize>,
    pub n_steps: Option<usize>,
    pub cycles: Option<&'a CycleTable>,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary<'a> {
    pub parameters: &'a CellParameters,
    pub entries: Vec<EntrySummary<'a>>,
    pub failures: Vec<String>,
}

/// The decoded files of one test unit, an optional merged entry, and their analysis.
///
/// A file that fails to decode does not stop the others; its error is kept so that the
/// caller can report it and so that merging can refuse an incomplete set.
#[derive(Debug)]
pub struct Dataset {
    files: Vec<DatasetEntry>,
    merged: Option<DatasetEntry>,
    failures: Vec<(PathBuf, NdaFileError)>,
    parameters: CellParameters,
    policy: StepBoundaryPolicy,
}

impl Dataset {
    /// Decode every file in order
    pub fn load(
        paths: &[PathBuf],
        overrides: &CellOverrides,
        policy: StepBoundaryPolicy,
    ) -> Result<Self, DatasetError> {
        let results = paths
            .iter()
            .map(|path| (path.clone(), NdaFile::open(path)))
            .collect();
        Self::from_results(results, overrides, policy)
    }

    /// Build a Dataset from already attempted decodes, given in load order.
    ///
    /// Fails only if no file decoded at all.
    pub fn from_results(
        results: Vec<(PathBuf, Result<NdaFile, NdaFileError>)>,
        overrides: &CellOverrides,
        policy: StepBoundaryPolicy,
    ) -> Result<Self, DatasetError> {
        let n_given = results.len();
        let mut files = Vec::new();
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(file) => files.push(DatasetEntry::from(file)),
                Err(e) => {
                    log::error!("Failed to decode {}: {e}", path.display());
                    failures.push((path, e));
                }
            }
        }

        let Some(last) = files.last() else {
            if n_given == 1 {
                if let Some((path, source)) = failures.pop() {
                    return Err(DatasetError::FileError { path, source });
                }
            }
            return Err(DatasetError::NoDecodedFiles(n_given));
        };
        let parameters = CellParameters::resolve(overrides, &last.metadata);
        log::info!("Cell parameters: {parameters:?}");

        Ok(Self {
            files,
            merged: None,
            failures,
            parameters,
            policy,
        })
    }

    /// Merge all decoded files into the merged entry. Refused if any file failed to decode.
    pub fn merge(&mut self) -> Result<(), DatasetError> {
        if !self.failures.is_empty() {
            return Err(DatasetError::MergeRefused(
                self.failures.iter().map(|(path, _)| path.clone()).collect(),
            ));
        }
        let merged = merge_entries(&self.files, self.policy)?;
        log::info!(
            "Merged {} files into {} primary records",
            self.files.len(),
            merged.streams.primary.len()
        );
        self.merged = Some(merged);
        Ok(())
    }

    /// Build the step and cycle tables of every entry
    pub fn analyze(&mut self, add_cycle_to_records: bool) {
        let parameters = &self.parameters;
        let files: Vec<DatasetEntry> = self
            .files
            .iter()
            .map(|entry| entry.analyzed(parameters, add_cycle_to_records))
            .collect();
        let merged = self
            .merged
            .as_ref()
            .map(|entry| entry.analyzed(parameters, add_cycle_to_records));
        self.files = files;
        self.merged = merged;
    }

    /// All entries, the decoded files in load order followed by the merged entry
    pub fn entries(&self) -> impl Iterator<Item = &DatasetEntry> {
        self.files.iter().chain(self.merged.as_ref())
    }

    pub fn entry(&self, name: &str) -> Option<&DatasetEntry> {
        self.entries().find(|entry| entry.name == name)
    }

    pub fn merged(&self) -> Option<&DatasetEntry> {
        self.merged.as_ref()
    }

    pub fn failures(&self) -> &[(PathBuf, NdaFileError)] {
        &self.failures
    }

    pub fn parameters(&self) -> &CellParameters {
        &self.parameters
    }

    pub fn summary(&self) -> DatasetSummary<'_> {
        DatasetSummary {
            parameters: &self.parameters,
            entries: self
                .entries()
                .map(|entry| EntrySummary {
                    name: &entry.name,
                    metadata: &entry.metadata,
                    n_records: entry.streams.primary.len(),
                    n_auxiliary_records: entry.streams.auxiliary.as_ref().map(|aux| aux.len()),
                    n_steps: entry.steps.as_ref().map(|steps| steps.len()),
                    cycles: entry.cycles.as_ref(),
                })
                .collect(),
            failures: self
                .failures
                .iter()
                .map(|(path, e)| format!("{}: {e}", path.display()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{file_bytes, primary_run, HeaderFixture};
    use crate::nda_file::decode_bytes;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    fn open_bytes(name: &str, bytes: &[u8]) -> Result<NdaFile, NdaFileError> {
        decode_bytes(bytes).map(|(metadata, streams)| NdaFile {
            path: PathBuf::from(name),
            metadata,
            streams,
        })
    }

    fn decoded(name: &str, start: PrimitiveDateTime, dchg: i64) -> NdaFile {
        // rest, charge, rest, discharge, charge
        let mut records = primary_run(start, &[(1, 4), (2, 1), (3, 4), (4, 2), (5, 1)]);
        records[1].capacity_chg = 360_000_000;
        records[3].capacity_dchg = dchg;
        open_bytes(name, &file_bytes(&HeaderFixture::default(), &records)).unwrap()
    }

    fn dataset(overrides: &CellOverrides) -> Dataset {
        let results = vec![
            (
                PathBuf::from("a.nda"),
                Ok(decoded("a.nda", datetime!(2021-03-14 09:00:00), 324_000_000)),
            ),
            (
                PathBuf::from("b.nda"),
                Ok(decoded("b.nda", datetime!(2021-03-15 09:00:00), 352_800_000)),
            ),
        ];
        Dataset::from_results(results, overrides, StepBoundaryPolicy::default()).unwrap()
    }

    #[test]
    fn test_parameters_fall_back_to_last_file() {
        let data = dataset(&CellOverrides::default());
        let parameters = data.parameters();
        assert_eq!(parameters.active_mass_g, 2.5);
        // 0.98 Ah observed in the last file
        assert_eq!(parameters.design_capacity_ah, Some(1.0));
        assert_eq!(parameters.rated_capacity_ah, Some(0.98));
        assert_eq!(parameters.voltage_upper_limit, Some(3.0));

        // A design capacity does not stand in for the rated capacity
        let overrides = CellOverrides {
            design_capacity_ah: Some(5.0),
            ..Default::default()
        };
        let parameters = dataset(&overrides).parameters().clone();
        assert_eq!(parameters.design_capacity_ah, Some(5.0));
        assert_eq!(parameters.rated_capacity_ah, Some(0.98));

        let overrides = CellOverrides {
            active_mass_g: Some(0.0),
            rated_capacity_ah: Some(2.0),
            ..Default::default()
        };
        let parameters = dataset(&overrides).parameters().clone();
        assert_eq!(parameters.active_mass_g, 2.5);
        assert_eq!(parameters.rated_capacity_ah, Some(2.0));
    }

    #[test]
    fn test_merge_and_analyze() {
        let mut data = dataset(&CellOverrides::default());
        data.merge().unwrap();
        data.analyze(true);

        let names: Vec<&str> = data.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.nda", "b.nda", "merged_data"]);

        let merged = data.entry("merged_data").unwrap();
        assert_eq!(merged.streams.primary.len(), 10);
        let Some(Table::Cycles(cycles)) = merged.table(CYCLE_TABLE) else {
            panic!("merged entry has no cycle table");
        };
        // Each file discharges once and then charges again
        let ids: Vec<u32> = cycles.rows().iter().map(|c| c.cycle_id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(merged.streams.primary.rows().iter().all(|r| r.cycle_id.is_some()));
        assert_eq!(cycles.rows()[0].normalized_dchg, Some(0.9 / 0.98));
        assert!(merged.table(AUX_TABLE).is_none());
        assert_eq!(
            merged.table_names(),
            [META_TABLE, RAW_TABLE, STEP_TABLE, CYCLE_TABLE]
        );
    }

    #[test]
    fn test_cycles_left_off_records() {
        let mut data = dataset(&CellOverrides::default());
        data.analyze(false);
        let entry = data.entry("a.nda").unwrap();
        assert!(entry.steps.is_some());
        assert!(entry.streams.primary.rows().iter().all(|r| r.cycle_id.is_none()));
    }

    #[test]
    fn test_merge_refused_after_failure() {
        let results = vec![
            (
                PathBuf::from("a.nda"),
                Ok(decoded("a.nda", datetime!(2021-03-14 09:00:00), 0)),
            ),
            (
                PathBuf::from("broken.nda"),
                open_bytes("broken.nda", &[0u8; 16]),
            ),
        ];
        let mut data =
            Dataset::from_results(results, &CellOverrides::default(), StepBoundaryPolicy::default())
                .unwrap();
        assert_eq!(data.failures().len(), 1);
        assert!(matches!(
            data.merge(),
            Err(DatasetError::MergeRefused(paths)) if paths == [PathBuf::from("broken.nda")]
        ));
        assert!(data.entry("a.nda").is_some());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("nda_reader_dataset_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.nda");
        let records = primary_run(datetime!(2021-03-14 09:00:00), &[(1, 1), (2, 2)]);
        std::fs::write(&good, file_bytes(&HeaderFixture::default(), &records)).unwrap();
        let missing = dir.join("missing.nda");

        let data = Dataset::load(
            &[good.clone(), missing.clone()],
            &CellOverrides::default(),
            StepBoundaryPolicy::default(),
        )
        .unwrap();
        let names: Vec<&str> = data.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["good.nda"]);
        assert_eq!(data.entry("good.nda").unwrap().path.as_ref(), Some(&good));
        assert!(matches!(
            data.failures(),
            [(path, NdaFileError::BadFilePath(_))] if *path == missing
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_nothing_decoded() {
        let bad = || open_bytes("x.nda", &[]);
        let one = vec![(PathBuf::from("x.nda"), bad())];
        assert!(matches!(
            Dataset::from_results(one, &CellOverrides::default(), StepBoundaryPolicy::default()),
            Err(DatasetError::FileError { .. })
        ));
        let two = vec![(PathBuf::from("x.nda"), bad()), (PathBuf::from("y.nda"), bad())];
        assert!(matches!(
            Dataset::from_results(two, &CellOverrides::default(), StepBoundaryPolicy::default()),
            Err(DatasetError::NoDecodedFiles(2))
        ));
    }
}
