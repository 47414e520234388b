use serde::{Deserialize, Serialize};
use std::ops::Range;
use time::PrimitiveDateTime;

use super::cycle::assign_cycle_ids;
use super::record::{Record, RecordTable, StepName};

/// Decides whether a change of source file in a merged stream opens a new step.
///
/// With `MergeAcrossFiles` a step that runs over the end of one file and continues with
/// the same method in the next file is reported as one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepBoundaryPolicy {
    #[default]
    MergeAcrossFiles,
    SplitAtFileBoundary,
}

/// Step id of every record: a new step starts whenever the step method changes
pub fn segment_steps(rows: &[Record], policy: StepBoundaryPolicy) -> Vec<u32> {
    let mut step_ids = Vec::with_capacity(rows.len());
    let mut step_id: u32 = 0;
    let mut previous: Option<&Record> = None;
    for row in rows {
        let is_boundary = match previous {
            None => true,
            Some(prev) => {
                prev.step_method != row.step_method
                    || (policy == StepBoundaryPolicy::SplitAtFileBoundary
                        && prev.source_file != row.source_file)
            }
        };
        if is_boundary {
            step_id += 1;
        }
        step_ids.push(step_id);
        previous = Some(row);
    }
    step_ids
}

/// Give each auxiliary record the step of its primary record.
///
/// Records are matched on (source file, raw record number). An auxiliary record without
/// an exact match takes the step of the closest preceding primary record, or the first
/// step if none precedes it.
pub fn join_auxiliary_steps(primary: &RecordTable, auxiliary: &RecordTable) -> RecordTable {
    let mut keyed: Vec<((u32, i32), u32)> = primary
        .rows()
        .iter()
        .map(|r| ((r.source_file, r.record_raw), r.step_id))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    let first_step = primary.rows().first().map_or(1, |r| r.step_id);

    let step_ids: Vec<u32> = auxiliary
        .rows()
        .iter()
        .map(|aux| {
            let key = (aux.source_file, aux.record_raw);
            let idx = keyed.partition_point(|(k, _)| *k <= key);
            match idx {
                0 => first_step,
                _ => keyed[idx - 1].1,
            }
        })
        .collect();
    auxiliary.with_step_ids(&step_ids)
}

/// Positions of the contiguous runs of equal step id
pub fn step_ranges(rows: &[Record]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for idx in 1..=rows.len() {
        if idx == rows.len() || rows[idx].step_id != rows[start].step_id {
            ranges.push(start..idx);
            start = idx;
        }
    }
    ranges
}

/// Summary of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRow {
    pub step_id: u32,
    pub cycle_id: u32,
    pub step_name: StepName,
    pub step_method: i16,
    pub step_time_m: f64,
    pub capacity_chg_ah: f64,
    pub capacity_dchg_ah: f64,
    pub energy_chg_wh: f64,
    pub energy_dchg_wh: f64,
    pub voltage_i_v: f64,
    pub voltage_f_v: f64,
    pub voltage_avg_v: f64,
    pub current_i_a: f64,
    pub current_f_a: f64,
    pub current_avg_a: f64,
    #[serde(with = "crate::record::timestamp_format")]
    pub timestamp_i: PrimitiveDateTime,
    #[serde(with = "crate::record::timestamp_format")]
    pub timestamp_f: PrimitiveDateTime,
    /// Change of the final voltage from the previous step
    pub voltage_drop_v: Option<f64>,
    pub resistance_ohm: Option<f64>,
    pub record_id_i: u32,
    pub record_id_f: u32,
}

impl StepRow {
    /// Aggregate one non-empty run of records. Cycle and predecessor fields are filled in
    /// by the table.
    fn from_run(run: &[Record]) -> Self {
        let first = &run[0];
        let last = &run[run.len() - 1];
        Self {
            step_id: first.step_id,
            cycle_id: 0,
            step_name: first.step_name,
            step_method: first.step_method,
            step_time_m: max_of(run, |r| r.step_time_s) / 60.0,
            capacity_chg_ah: max_of(run, |r| r.capacity_chg_ah),
            capacity_dchg_ah: max_of(run, |r| r.capacity_dchg_ah),
            energy_chg_wh: max_of(run, |r| r.energy_chg_wh),
            energy_dchg_wh: max_of(run, |r| r.energy_dchg_wh),
            voltage_i_v: first.voltage_v,
            voltage_f_v: last.voltage_v,
            voltage_avg_v: mean_of(run, |r| r.voltage_v),
            current_i_a: first.current_a,
            current_f_a: last.current_a,
            current_avg_a: mean_of(run, |r| r.current_a),
            timestamp_i: first.timestamp,
            timestamp_f: last.timestamp,
            voltage_drop_v: None,
            resistance_ohm: None,
            record_id_i: first.record_id,
            record_id_f: last.record_id,
        }
    }
}

fn max_of(run: &[Record], value: impl Fn(&Record) -> f64) -> f64 {
    run.iter().map(value).fold(f64::MIN, f64::max)
}

fn mean_of(run: &[Record], value: impl Fn(&Record) -> f64) -> f64 {
    run.iter().map(value).sum::<f64>() / run.len() as f64
}

/// The step table of one stream, in step id order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StepTable {
    rows: Vec<StepRow>,
}

impl StepTable {
    /// Aggregate segmented records into steps and assign their cycles.
    ///
    /// Resistance is left empty for the first step and for steps starting at zero current.
    pub fn from_records(records: &RecordTable) -> Self {
        let rows = records.rows();
        let mut steps: Vec<StepRow> = step_ranges(rows)
            .into_iter()
            .map(|range| StepRow::from_run(&rows[range]))
            .collect();

        for idx in 1..steps.len() {
            let drop = steps[idx].voltage_f_v - steps[idx - 1].voltage_f_v;
            let step = &mut steps[idx];
            step.voltage_drop_v = Some(drop);
            step.resistance_ohm = if step.current_i_a != 0.0 {
                Some(drop / step.current_i_a)
            } else {
                None
            };
        }

        let cycle_ids = assign_cycle_ids(steps.iter().map(|s| s.step_name));
        for (step, cycle_id) in steps.iter_mut().zip(cycle_ids) {
            step.cycle_id = cycle_id;
        }

        Self { rows: steps }
    }

    pub fn rows(&self) -> &[StepRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cycle of each step, indexed by step id - 1
    pub fn cycle_of_step(&self) -> Vec<u32> {
        self.rows.iter().map(|s| s.cycle_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::record;
    use crate::record::StreamKind;

    fn segmented(methods: &[i16]) -> RecordTable {
        let rows: Vec<Record> = methods
            .iter()
            .enumerate()
            .map(|(idx, method)| record(StreamKind::Primary, idx as i32 + 1, *method))
            .collect();
        let table = RecordTable::new(rows).sequenced();
        let ids = segment_steps(table.rows(), StepBoundaryPolicy::MergeAcrossFiles);
        table.with_step_ids(&ids)
    }

    #[test]
    fn test_run_length_segmentation() {
        let table = segmented(&[1, 1, 2, 2, 2, 1, 3, 3]);
        let ids: Vec<u32> = table.rows().iter().map(|r| r.step_id).collect();
        assert_eq!(ids, [1, 1, 2, 2, 2, 3, 4, 4]);
        assert!(segment_steps(&[], StepBoundaryPolicy::MergeAcrossFiles).is_empty());
    }

    #[test]
    fn test_steps_partition_records() {
        let table = segmented(&[4, 4, 1, 1, 1, 4, 2, 2, 4]);
        let rows = table.rows();
        let ranges = step_ranges(rows);
        assert_eq!(ranges.len(), 5);
        let mut expected_start = 0;
        for (idx, range) in ranges.iter().enumerate() {
            assert_eq!(range.start, expected_start);
            assert!(!range.is_empty());
            let method = rows[range.start].step_method;
            assert!(rows[range.clone()].iter().all(|r| r.step_method == method));
            if idx > 0 {
                assert_ne!(rows[ranges[idx - 1].start].step_method, method);
            }
            expected_start = range.end;
        }
        assert_eq!(expected_start, rows.len());
    }

    #[test]
    fn test_file_boundary_policy() {
        let rows: Vec<Record> = (0..4)
            .map(|idx| Record {
                source_file: if idx < 2 { 0 } else { 1 },
                ..record(StreamKind::Primary, idx + 1, 7)
            })
            .collect();
        let merged = segment_steps(&rows, StepBoundaryPolicy::MergeAcrossFiles);
        let split = segment_steps(&rows, StepBoundaryPolicy::SplitAtFileBoundary);
        assert_eq!(merged, [1, 1, 1, 1]);
        assert_eq!(split, [1, 1, 2, 2]);
    }

    #[test]
    fn test_step_aggregates() {
        let mut rows = segmented(&[4, 4, 2, 2]).into_rows();
        let values = [
            (0.0, 3.5, 0.0, 0.0),
            (60.0, 3.6, 0.0, 0.0),
            (0.0, 3.5, -1.0, 0.1),
            (120.0, 3.0, -2.0, 0.5),
        ];
        for (row, (time_s, volts, amps, dchg)) in rows.iter_mut().zip(values) {
            row.step_time_s = time_s;
            row.voltage_v = volts;
            row.current_a = amps;
            row.capacity_dchg_ah = dchg;
        }
        let steps = StepTable::from_records(&RecordTable::new(rows));
        assert_eq!(steps.len(), 2);

        let rest = &steps.rows()[0];
        assert_eq!(rest.step_id, 1);
        assert_eq!(rest.step_time_m, 1.0);
        assert_eq!(rest.voltage_i_v, 3.5);
        assert_eq!(rest.voltage_f_v, 3.6);
        assert_eq!(rest.voltage_drop_v, None);
        assert_eq!(rest.resistance_ohm, None);
        assert_eq!((rest.record_id_i, rest.record_id_f), (1, 2));

        let dchg = &steps.rows()[1];
        assert_eq!(dchg.step_time_m, 2.0);
        assert_eq!(dchg.capacity_dchg_ah, 0.5);
        assert_eq!(dchg.current_i_a, -1.0);
        assert_eq!(dchg.current_f_a, -2.0);
        assert_eq!(dchg.current_avg_a, -1.5);
        assert_eq!(dchg.voltage_avg_v, 3.25);
        let drop = 3.0 - 3.6;
        assert_eq!(dchg.voltage_drop_v, Some(drop));
        assert_eq!(dchg.resistance_ohm, Some(drop / -1.0));
    }

    #[test]
    fn test_zero_current_resistance() {
        let table = segmented(&[4, 1]);
        let steps = StepTable::from_records(&table);
        assert_eq!(steps.rows()[1].voltage_drop_v, Some(0.0));
        assert_eq!(steps.rows()[1].resistance_ohm, None);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let table = segmented(&[4, 2, 2, 4, 1, 1, 4, 2]);
        let steps = StepTable::from_records(&table);
        let with_cycles = table.with_cycle_ids(&steps.cycle_of_step());
        assert_eq!(StepTable::from_records(&with_cycles), steps);
        assert_eq!(StepTable::from_records(&table), steps);
    }

    #[test]
    fn test_auxiliary_join_fallback() {
        let primary = segmented(&[1, 1, 2, 2]);
        let aux_rows = [0, 2, 3, 10]
            .iter()
            .map(|raw| record(StreamKind::Auxiliary, *raw, 0))
            .collect();
        let aux = join_auxiliary_steps(&primary, &RecordTable::new(aux_rows).sequenced());
        let ids: Vec<u32> = aux.rows().iter().map(|r| r.step_id).collect();
        assert_eq!(ids, [1, 1, 2, 2]);
    }
}
