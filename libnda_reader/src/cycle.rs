use serde::Serialize;

use super::record::StepName;
use super::step::{StepRow, StepTable};

/// Cycle of every step, in step order.
///
/// A cycle ends right before the first charge step (CC_Chg or CCCV_Chg) that follows a
/// CC_Dchg step of the same cycle. All other steps stay in the running cycle.
pub fn assign_cycle_ids(names: impl IntoIterator<Item = StepName>) -> Vec<u32> {
    let mut cycle_counter: u32 = 1;
    let mut discharge_seen = false;
    names
        .into_iter()
        .map(|name| {
            if name.is_discharge() {
                discharge_seen = true;
            }
            if name.is_charge() && discharge_seen {
                cycle_counter += 1;
                discharge_seen = false;
            }
            cycle_counter
        })
        .collect()
}

/// Summary of one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRow {
    pub cycle_id: u32,
    pub cycle_time_h: f64,
    pub capacity_chg_ah: f64,
    pub capacity_dchg_ah: f64,
    pub energy_chg_wh: f64,
    pub energy_dchg_wh: f64,
    /// Discharge over charge capacity; empty when nothing was charged
    pub coulombic_eff: Option<f64>,
    /// Discharge capacity over the rated capacity
    pub normalized_dchg: Option<f64>,
    pub specific_chg_mahg: f64,
    pub specific_dchg_mahg: f64,
    pub step_id_i: u32,
    pub step_id_f: u32,
}

impl CycleRow {
    fn from_steps(steps: &[StepRow], rated_capacity_ah: Option<f64>, mass_g: f64) -> Self {
        let capacity_chg_ah = sum_of(steps, |s| s.capacity_chg_ah);
        let capacity_dchg_ah = sum_of(steps, |s| s.capacity_dchg_ah);
        Self {
            cycle_id: steps[0].cycle_id,
            cycle_time_h: sum_of(steps, |s| s.step_time_m) / 60.0,
            capacity_chg_ah,
            capacity_dchg_ah,
            energy_chg_wh: sum_of(steps, |s| s.energy_chg_wh),
            energy_dchg_wh: sum_of(steps, |s| s.energy_dchg_wh),
            coulombic_eff: (capacity_chg_ah != 0.0).then(|| capacity_dchg_ah / capacity_chg_ah),
            normalized_dchg: rated_capacity_ah
                .filter(|rated| *rated != 0.0)
                .map(|rated| capacity_dchg_ah / rated),
            specific_chg_mahg: capacity_chg_ah * 1000.0 / mass_g,
            specific_dchg_mahg: capacity_dchg_ah * 1000.0 / mass_g,
            step_id_i: steps[0].step_id,
            step_id_f: steps[steps.len() - 1].step_id,
        }
    }
}

fn sum_of(steps: &[StepRow], value: impl Fn(&StepRow) -> f64) -> f64 {
    steps.iter().map(value).sum()
}

/// The cycle table of one stream, in cycle id order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CycleTable {
    rows: Vec<CycleRow>,
}

impl CycleTable {
    /// Aggregate the steps of each cycle.
    ///
    /// An active mass of exactly zero means the mass was never set; specific capacities
    /// are then reported per 1 g.
    pub fn from_steps(steps: &StepTable, rated_capacity_ah: Option<f64>, active_mass_g: f64) -> Self {
        let mass_g = if active_mass_g == 0.0 { 1.0 } else { active_mass_g };
        let steps = steps.rows();
        let mut rows = Vec::new();
        let mut start = 0;
        for idx in 1..=steps.len() {
            if idx == steps.len() || steps[idx].cycle_id != steps[start].cycle_id {
                rows.push(CycleRow::from_steps(&steps[start..idx], rated_capacity_ah, mass_g));
                start = idx;
            }
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[CycleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
