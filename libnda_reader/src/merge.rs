use super::dataset::DatasetEntry;
use super::error::DatasetError;
use super::record::{Record, RecordTable};
use super::step::StepBoundaryPolicy;
use super::stream::Streams;

/// Merge the entries of several files of one test unit into a single time ordered entry.
///
/// Files are ordered by their first primary timestamp and every record is tagged with the
/// position of its file in that order. The auxiliary stream is only merged if every file
/// has one. Steps are segmented again over the merged stream, so the policy decides what
/// happens to a step method that continues across a file boundary. The merged metadata is
/// that of the last entry, with bounds observed over the merged records.
pub fn merge_entries(
    entries: &[DatasetEntry],
    policy: StepBoundaryPolicy,
) -> Result<DatasetEntry, DatasetError> {
    let Some(last) = entries.last() else {
        return Err(DatasetError::NoDecodedFiles(0));
    };

    let mut order = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match entry.streams.primary.first_timestamp() {
            Some(start) => order.push((start, idx)),
            None => return Err(DatasetError::EmptyPrimaryStream(entry.name.clone())),
        }
    }
    order.sort();
    for (ordinal, (start, idx)) in order.iter().enumerate() {
        log::info!(
            "Merging {} as file {ordinal} (starts {start})",
            entries[*idx].name
        );
    }

    let primary = concatenate(
        order
            .iter()
            .map(|(_, idx)| &entries[*idx].streams.primary),
    );
    let auxiliary = if entries.iter().all(|e| e.streams.auxiliary.is_some()) {
        Some(concatenate(
            order
                .iter()
                .filter_map(|(_, idx)| entries[*idx].streams.auxiliary.as_ref()),
        ))
    } else {
        log::info!("Not every file has auxiliary records; the merged entry has none");
        None
    };

    let streams = Streams { primary, auxiliary }.segmented(policy);
    Ok(DatasetEntry {
        name: super::constants::MERGED_ENTRY_NAME.to_string(),
        path: None,
        metadata: last.metadata.with_bounds(&streams.primary),
        streams,
        steps: None,
        cycles: None,
    })
}

/// Concatenate tables in the given order, then re-sort by timestamp and sequence again.
/// The sort is stable, so records of equal timestamp keep their file order.
fn concatenate<'a>(tables: impl Iterator<Item = &'a RecordTable>) -> RecordTable {
    let mut rows: Vec<Record> = Vec::new();
    for (ordinal, table) in tables.enumerate() {
        rows.extend(table.rows().iter().map(|row| Record {
            source_file: ordinal as u32,
            cycle_id: None,
            ..row.clone()
        }));
    }
    rows.sort_by_key(|row| row.timestamp);
    RecordTable::new(rows).sequenced()
}
