use fxhash::FxHashSet;

use super::error::FormatError;
use super::record::{RawRecord, Record, RecordTable, StreamKind};
use super::scale::CurrentLimit;
use super::step::{join_auxiliary_steps, segment_steps, StepBoundaryPolicy};

/// The two record streams of a file (or of a merged set of files)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Streams {
    pub primary: RecordTable,
    /// None when the auxiliary channel was not recorded at all
    pub auxiliary: Option<RecordTable>,
}

impl Streams {
    /// Split raw records into the primary and auxiliary streams, converting them to
    /// physical units.
    ///
    /// Records with an unknown indicator are dropped. Within a stream the first record
    /// with a given raw record number wins, and the stream is ordered by raw record number
    /// and sequenced from 1. `body_start` is the file offset of the first record.
    pub fn split(
        raws: &[RawRecord],
        limit: CurrentLimit,
        body_start: usize,
    ) -> Result<Self, FormatError> {
        let mut primary: Vec<Record> = Vec::new();
        let mut auxiliary: Vec<Record> = Vec::new();
        let mut seen_primary: FxHashSet<i32> = FxHashSet::default();
        let mut seen_auxiliary: FxHashSet<i32> = FxHashSet::default();
        let mut n_discarded: usize = 0;
        let mut n_duplicates: usize = 0;

        for (idx, raw) in raws.iter().enumerate() {
            let Some(kind) = StreamKind::from_indicator(raw.aux_indicator) else {
                n_discarded += 1;
                continue;
            };
            let (rows, seen) = match kind {
                StreamKind::Primary => (&mut primary, &mut seen_primary),
                StreamKind::Auxiliary => (&mut auxiliary, &mut seen_auxiliary),
            };
            if !seen.insert(raw.record_raw) {
                n_duplicates += 1;
                continue;
            }
            rows.push(Record::from_raw(raw, kind, limit, idx, body_start)?);
        }

        if n_discarded > 0 {
            log::info!("Discarded {n_discarded} records with an unknown stream indicator");
        }
        if n_duplicates > 0 {
            log::info!("Dropped {n_duplicates} records with a repeated record number");
        }

        Ok(Self {
            primary: sequence(primary),
            auxiliary: if auxiliary.is_empty() {
                None
            } else {
                Some(sequence(auxiliary))
            },
        })
    }

    /// Assign step ids to the primary stream and share them with the auxiliary stream
    pub fn segmented(&self, policy: StepBoundaryPolicy) -> Self {
        let primary = self
            .primary
            .with_step_ids(&segment_steps(self.primary.rows(), policy));
        let auxiliary = self
            .auxiliary
            .as_ref()
            .map(|aux| join_auxiliary_steps(&primary, aux));
        Self { primary, auxiliary }
    }

    /// Propagate the cycle ids of the steps onto the records of both streams
    pub fn with_cycle_ids(&self, cycle_of_step: &[u32]) -> Self {
        Self {
            primary: self.primary.with_cycle_ids(cycle_of_step),
            auxiliary: self
                .auxiliary
                .as_ref()
                .map(|aux| aux.with_cycle_ids(cycle_of_step)),
        }
    }
}

fn sequence(mut rows: Vec<Record>) -> RecordTable {
    rows.sort_by_key(|row| row.record_raw);
    RecordTable::new(rows).sequenced()
}
