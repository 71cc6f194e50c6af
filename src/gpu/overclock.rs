//! Overclock transactions
//!
//! An [`OverclockPlan`] is validated in full before anything is staged, and
//! staged in full before anything is submitted. A plan that fails to build
//! has no effect on the GPU.

use super::dataset::Dataset;
use super::metrics::{self, MILLI_SCALE, THERMAL_SCALE};
use crate::domain::{OverclockArea, OverclockRequest};
use crate::error::OverclockError;
use crate::nvapi::interface::NvapiCalls;
use crate::nvapi::types::{
    PhysicalGpuHandle, PowerPoliciesStatus, Pstates20, ThermalPoliciesStatus,
    THERMAL_CONTROLLER_GPU_INTERNAL,
};
use crate::nvapi::version::VersionedStruct;
use crate::nvapi::FunctionId;

use serde::Serialize;

/// One staged raw write
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StagedChange {
    pub area: OverclockArea,
    /// Requested value in display units
    pub value: f32,
    /// Value written to the driver
    pub raw: i32,
    /// Clock domain, voltage domain, pstate or thermal controller targeted
    pub target: u32,
    pub call: &'static str,
}

/// Validated, staged overclock ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct OverclockPlan {
    pstates20: Option<Pstates20>,
    power_status: Option<PowerPoliciesStatus>,
    thermal_status: Option<ThermalPoliciesStatus>,
    changes: Vec<StagedChange>,
}

fn to_raw(value: f32, scale: f32) -> i32 {
    (value * scale).round() as i32
}

/// Single-state pstate record, created on first use
fn staged_pstates(slot: &mut Option<Pstates20>, state_num: u32) -> &mut Pstates20 {
    slot.get_or_insert_with(|| {
        let mut pstates = Pstates20::stamped();
        pstates.state_count = 1;
        pstates.states[0].state_num = state_num;
        pstates
    })
}

impl OverclockPlan {
    /// Validate `request` against `dataset` and stage the raw records
    pub fn build(dataset: &Dataset, request: &OverclockRequest) -> Result<Self, OverclockError> {
        if request.is_empty() {
            return Err(OverclockError::EmptyRequest);
        }

        let profile = metrics::overclock_profile(dataset);
        for (area, value) in request.iter() {
            let setting = profile.get(area);
            if !setting.editable {
                return Err(OverclockError::NotEditable(area));
            }
            if !setting.contains(value) {
                return Err(OverclockError::OutOfRange {
                    area,
                    value,
                    min: setting.min,
                    max: setting.max,
                });
            }
        }

        let state_num = metrics::best_pstate(&dataset.pstates20)
            .map(|state| state.state_num)
            .unwrap_or(0);

        let mut plan = Self {
            pstates20: None,
            power_status: None,
            thermal_status: None,
            changes: Vec::with_capacity(request.len()),
        };

        for (area, value) in request.iter() {
            let change = match area {
                OverclockArea::Core | OverclockArea::Memory | OverclockArea::Shader => {
                    let domain = metrics::clock_domain(area).unwrap_or_default();
                    let raw = to_raw(value, MILLI_SCALE);
                    let pstates = staged_pstates(&mut plan.pstates20, state_num);
                    let slot = pstates.clock_count as usize;
                    let entry = &mut pstates.states[0].clocks[slot];
                    entry.domain = domain;
                    entry.freq_delta.value = raw;
                    pstates.clock_count += 1;
                    StagedChange {
                        area,
                        value,
                        raw,
                        target: domain,
                        call: FunctionId::SetPstates20.name(),
                    }
                }
                OverclockArea::Overvolt => {
                    let domain = metrics::core_voltage_domain(&dataset.pstates20)
                        .ok_or(OverclockError::MissingVoltageDomain)?;
                    let raw = to_raw(value, MILLI_SCALE);
                    let pstates = staged_pstates(&mut plan.pstates20, state_num);
                    pstates.over_volt.voltage_count = 1;
                    pstates.over_volt.voltages[0].domain = domain;
                    pstates.over_volt.voltages[0].volt_delta.value = raw;
                    StagedChange {
                        area,
                        value,
                        raw,
                        target: domain,
                        call: FunctionId::SetPstates20.name(),
                    }
                }
                OverclockArea::PowerLimit => {
                    let raw = to_raw(value, MILLI_SCALE);
                    let mut status = PowerPoliciesStatus::stamped();
                    status.count = 1;
                    status.entries[0].pstate_id = state_num;
                    status.entries[0].power = raw as u32;
                    plan.power_status = Some(status);
                    StagedChange {
                        area,
                        value,
                        raw,
                        target: state_num,
                        call: FunctionId::ClientPowerPoliciesSetStatus.name(),
                    }
                }
                OverclockArea::ThermalLimit => {
                    let raw = to_raw(value, THERMAL_SCALE);
                    let flags = dataset
                        .thermal_status
                        .entries()
                        .iter()
                        .find(|entry| entry.controller == THERMAL_CONTROLLER_GPU_INTERNAL)
                        .map_or(0, |entry| entry.flags);
                    let mut status = ThermalPoliciesStatus::stamped();
                    status.count = 1;
                    status.entries[0].controller = THERMAL_CONTROLLER_GPU_INTERNAL;
                    status.entries[0].value = raw;
                    status.entries[0].flags = flags;
                    plan.thermal_status = Some(status);
                    StagedChange {
                        area,
                        value,
                        raw,
                        target: THERMAL_CONTROLLER_GPU_INTERNAL as u32,
                        call: FunctionId::ClientThermalPoliciesSetStatus.name(),
                    }
                }
            };
            plan.changes.push(change);
        }

        Ok(plan)
    }

    /// Staged writes, in request order
    pub fn changes(&self) -> &[StagedChange] {
        &self.changes
    }

    pub fn pstates20(&self) -> Option<&Pstates20> {
        self.pstates20.as_ref()
    }

    pub fn power_status(&self) -> Option<&PowerPoliciesStatus> {
        self.power_status.as_ref()
    }

    pub fn thermal_status(&self) -> Option<&ThermalPoliciesStatus> {
        self.thermal_status.as_ref()
    }

    /// Number of records that received at least one entry
    pub fn submission_count(&self) -> usize {
        usize::from(self.pstates20.is_some())
            + usize::from(self.power_status.is_some())
            + usize::from(self.thermal_status.is_some())
    }

    /// Submit every staged record
    ///
    /// All records are submitted even after a rejection; the first rejection
    /// is returned.
    pub fn submit(
        mut self,
        calls: &dyn NvapiCalls,
        gpu: PhysicalGpuHandle,
    ) -> Result<(), OverclockError> {
        if self.submission_count() == 0 {
            return Err(OverclockError::EmptyRequest);
        }

        let mut results = Vec::with_capacity(3);
        if let Some(pstates) = self.pstates20.as_mut() {
            results.push((FunctionId::SetPstates20, calls.set_pstates20(gpu, pstates)));
        }
        if let Some(status) = self.power_status.as_mut() {
            results.push((
                FunctionId::ClientPowerPoliciesSetStatus,
                calls.set_power_policies_status(gpu, status),
            ));
        }
        if let Some(status) = self.thermal_status.as_mut() {
            results.push((
                FunctionId::ClientThermalPoliciesSetStatus,
                calls.set_thermal_policies_status(gpu, status),
            ));
        }

        for (call, status) in results {
            if !status.is_ok() {
                log::debug!("{} rejected: {}", call, status);
                return Err(OverclockError::Rejected { call, status });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;
    use crate::nvapi::types::{CLOCK_DOMAIN_GRAPHICS, CLOCK_DOMAIN_MEMORY};

    fn setup() -> (MockNvapi, Dataset) {
        let mock = MockNvapi::new(1);
        let dataset = Dataset::poll(&mock, mock.gpu(0).handle).unwrap();
        (mock, dataset)
    }

    #[test]
    fn test_empty_request() {
        let (_, dataset) = setup();
        assert_eq!(
            OverclockPlan::build(&dataset, &OverclockRequest::new()),
            Err(OverclockError::EmptyRequest)
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let (_, dataset) = setup();
        let request = OverclockRequest::new().with(OverclockArea::Core, 250.0);
        assert_eq!(
            OverclockPlan::build(&dataset, &request),
            Err(OverclockError::OutOfRange {
                area: OverclockArea::Core,
                value: 250.0,
                min: -200.0,
                max: 200.0,
            })
        );
    }

    #[test]
    fn test_not_editable_rejected() {
        let (_, dataset) = setup();
        let request = OverclockRequest::new().with(OverclockArea::Shader, 0.0);
        assert_eq!(
            OverclockPlan::build(&dataset, &request),
            Err(OverclockError::NotEditable(OverclockArea::Shader))
        );
    }

    #[test]
    fn test_one_bad_entry_rejects_all() {
        let (_, dataset) = setup();
        let request = OverclockRequest::new()
            .with(OverclockArea::Memory, 100.0)
            .with(OverclockArea::PowerLimit, 200.0);
        assert!(matches!(
            OverclockPlan::build(&dataset, &request),
            Err(OverclockError::OutOfRange {
                area: OverclockArea::PowerLimit,
                ..
            })
        ));
    }

    #[test]
    fn test_stages_clocks_into_best_pstate() {
        let (_, mut dataset) = setup();
        dataset.pstates20.states[0].state_num = 2;

        let request = OverclockRequest::new()
            .with(OverclockArea::Core, 150.0)
            .with(OverclockArea::Memory, -100.5);
        let plan = OverclockPlan::build(&dataset, &request).unwrap();

        let pstates = plan.pstates20().unwrap();
        assert_eq!(pstates.state_count, 1);
        assert_eq!(pstates.clock_count, 2);
        assert_eq!(pstates.states[0].state_num, 2);
        assert_eq!(pstates.states[0].clocks[0].domain, CLOCK_DOMAIN_GRAPHICS);
        assert_eq!(pstates.states[0].clocks[0].freq_delta.value, 150_000);
        assert_eq!(pstates.states[0].clocks[1].domain, CLOCK_DOMAIN_MEMORY);
        assert_eq!(pstates.states[0].clocks[1].freq_delta.value, -100_500);
        assert_eq!(pstates.over_volt.voltage_count, 0);

        assert!(plan.power_status().is_none());
        assert_eq!(plan.submission_count(), 1);
        assert_eq!(plan.changes().len(), 2);
    }

    #[test]
    fn test_stages_overvolt_on_core_voltage_domain() {
        let (_, mut dataset) = setup();
        dataset.pstates20.states[0].clocks[0].voltage_domain = 3;
        dataset.pstates20.over_volt.voltages[0].domain = 3;

        let request = OverclockRequest::new().with(OverclockArea::Overvolt, 25.0);
        let plan = OverclockPlan::build(&dataset, &request).unwrap();

        let pstates = plan.pstates20().unwrap();
        assert_eq!(pstates.clock_count, 0);
        assert_eq!(pstates.over_volt.voltage_count, 1);
        assert_eq!(pstates.over_volt.voltages[0].domain, 3);
        assert_eq!(pstates.over_volt.voltages[0].volt_delta.value, 25_000);
    }

    #[test]
    fn test_stages_power_and_thermal_separately() {
        let (_, dataset) = setup();
        let request = OverclockRequest::new()
            .with(OverclockArea::PowerLimit, 110.0)
            .with(OverclockArea::ThermalLimit, 87.5);
        let plan = OverclockPlan::build(&dataset, &request).unwrap();

        assert!(plan.pstates20().is_none());
        let power = plan.power_status().unwrap();
        assert_eq!(power.count, 1);
        assert_eq!(power.entries[0].pstate_id, 0);
        assert_eq!(power.entries[0].power, 110_000);

        let thermal = plan.thermal_status().unwrap();
        assert_eq!(thermal.entries[0].controller, THERMAL_CONTROLLER_GPU_INTERNAL);
        assert_eq!(thermal.entries[0].value, 22_400);
        assert_eq!(thermal.entries[0].flags, 1);
        assert_eq!(plan.submission_count(), 2);
    }

    #[test]
    fn test_submit_only_populated_records() {
        let (mock, dataset) = setup();
        let request = OverclockRequest::new().with(OverclockArea::PowerLimit, 90.0);
        let plan = OverclockPlan::build(&dataset, &request).unwrap();

        plan.submit(&mock, mock.gpu(0).handle).unwrap();
        assert_eq!(mock.call_count(FunctionId::SetPstates20), 0);
        assert_eq!(mock.call_count(FunctionId::ClientPowerPoliciesSetStatus), 1);
        assert_eq!(mock.call_count(FunctionId::ClientThermalPoliciesSetStatus), 0);
        assert_eq!(mock.gpu(0).power_status.entries[0].power, 90_000);
    }

    #[test]
    fn test_submit_reports_rejection_after_trying_all() {
        let (mock, dataset) = setup();
        mock.fail_call(FunctionId::SetPstates20, NvStatus::INVALID_USER_PRIVILEGE);

        let request = OverclockRequest::new()
            .with(OverclockArea::Core, 50.0)
            .with(OverclockArea::PowerLimit, 90.0);
        let plan = OverclockPlan::build(&dataset, &request).unwrap();

        let err = plan.submit(&mock, mock.gpu(0).handle).unwrap_err();
        assert_eq!(
            err,
            OverclockError::Rejected {
                call: FunctionId::SetPstates20,
                status: NvStatus::INVALID_USER_PRIVILEGE,
            }
        );
        assert_eq!(mock.call_count(FunctionId::ClientPowerPoliciesSetStatus), 1);
    }
}
