use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::config::Config;
use super::dataset::Dataset;
use super::error::{NdaFileError, ProcessorError};
use super::nda_file::NdaFile;
use super::worker_status::{Stage, WorkerStatus};

/// A file to decode, with its index in the config's file list
type FileJob = (usize, PathBuf);
type FileResult = (usize, PathBuf, Result<NdaFile, NdaFileError>);

/// Decode a subset of files. Failures are kept per file and do not stop the worker
pub fn process_subset(
    subset: Vec<FileJob>,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<Vec<FileResult>, ProcessorError> {
    let n_files = subset.len();
    let mut results = Vec::with_capacity(n_files);
    for (count, (file_index, path)) in subset.into_iter().enumerate() {
        tx.send(WorkerStatus::new(
            count as f32 / n_files as f32,
            file_index,
            worker_id,
            Stage::Decoding,
        ))?;
        let result = NdaFile::open(&path);
        results.push((file_index, path, result));
    }
    if let Some((file_index, _, _)) = results.last() {
        tx.send(WorkerStatus::new(1.0, *file_index, worker_id, Stage::Done))?;
    }
    Ok(results)
}

/// Divide the file list in to a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<FileJob>> {
    let mut subsets: Vec<Vec<FileJob>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, path) in config.file_paths.iter().enumerate() {
        subsets[idx % n_subsets].push((idx, path.clone()))
    }

    subsets
}

/// Write the YAML summary of the dataset
pub fn write_summary(dataset: &Dataset, path: &Path) -> Result<(), ProcessorError> {
    let yaml_str = serde_yaml::to_string(&dataset.summary())?;
    std::fs::write(path, yaml_str)?;
    log::info!("Wrote summary to {}", path.display());
    Ok(())
}

/// The main loop of nda_reader.
///
/// This takes in a config (and progress channel), decodes the files over the configured
/// number of workers, then merges and analyzes them. Only workers with files are created.
/// A refused merge is logged; the decoded files are analyzed regardless.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<Dataset, ProcessorError> {
    if !config.is_n_threads_valid() {
        return Err(ProcessorError::BadThreadCount(config.n_threads));
    }
    for path in config.missing_files() {
        log::warn!("File {} does not exist", path.display());
    }

    let subsets = create_subsets(&config);
    let joined = std::thread::scope(|scope| {
        let handles: Vec<_> = subsets
            .into_iter()
            .enumerate()
            .filter(|(_, subset)| !subset.is_empty())
            .map(|(worker_id, subset)| {
                let tx = tx.clone();
                scope.spawn(move || process_subset(subset, tx, worker_id))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });

    let mut results: Vec<FileResult> = Vec::new();
    for worker in joined {
        match worker {
            Ok(res) => results.extend(res?),
            Err(_) => return Err(ProcessorError::WorkerPanic),
        }
    }
    results.sort_by_key(|(file_index, _, _)| *file_index);
    let n_files = results.len();
    let last_index = n_files.saturating_sub(1);

    let mut dataset = Dataset::from_results(
        results
            .into_iter()
            .map(|(_, path, result)| (path, result))
            .collect(),
        &config.overrides(),
        config.step_boundary,
    )?;
    log::info!(
        "Decoded {} of {} files",
        n_files - dataset.failures().len(),
        n_files
    );

    if config.merge {
        tx.send(WorkerStatus::new(0.0, last_index, 0, Stage::Merging))?;
        // The decoded files are still analyzed without the merged entry
        if let Err(e) = dataset.merge() {
            log::error!("{e}");
        }
    }

    tx.send(WorkerStatus::new(0.0, last_index, 0, Stage::Analyzing))?;
    dataset.analyze(config.add_cycle_to_records);

    if let Some(path) = &config.summary_path {
        write_summary(&dataset, path)?;
    }
    tx.send(WorkerStatus::new(1.0, last_index, 0, Stage::Done))?;
    Ok(dataset)
}
