use std::fmt::Display;

use num_traits::Zero;
use phf::phf_map;
use serde::Serialize;

use crate::base::behavior::*;
use crate::base::module::IsModule;
use crate::chip::engine::CompositionEngine;
use crate::chip::group::SubsystemGroup;
use crate::chip::instance::Instance;
use crate::chip::kind::SubsystemKind;
use crate::leaf::EvalMode;
use crate::power::{clamp_derived, PowerRecord};
use crate::sim::error::EstimateError;

static BLOCK_ABBREVIATIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "icache" => "IC",
    "dcache" => "DC",
    "btb" => "BTB",
    "itlb" => "ITLB",
    "dtlb" => "DTLB",
    "regfile" => "RF",
    "alu" => "ALU",
    "fpu" => "FPU",
    "mul" => "MUL",
    "lsq" => "LSQ",
    "rob" => "ROB",
    "rename" => "RNU",
    "scheduler" => "SCHED",
    "ifu" => "IFU",
    "lsu" => "LSU",
    "mmu" => "MMU",
    "exu" => "EXU",
    "l2" => "L2",
};

fn abbreviate(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    BLOCK_ABBREVIATIONS
        .get(lower.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Column name of physical unit `r` of `kind`.
fn leaf_name(kind: SubsystemKind, r: usize) -> String {
    match kind {
        SubsystemKind::Core => format!("C{}", r),
        _ => format!("{}_{}", kind.tag(), r),
    }
}

/// Every physical unit of `group`, replicas of a homogeneous group included.
fn units(group: &SubsystemGroup) -> Vec<(usize, &Instance)> {
    if group.is_homogeneous() {
        match group.instances().first() {
            Some(rep) => (0..group.replication_count()).map(|r| (r, rep)).collect(),
            None => vec![],
        }
    } else {
        group.instances().iter().enumerate().collect()
    }
}

fn group_record(group: &SubsystemGroup, mode: EvalMode) -> PowerRecord {
    match mode {
        EvalMode::Peak => group.aggregate_power(),
        EvalMode::Runtime => group.aggregate_runtime_power(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSummary {
    pub peak_power: f64,
    pub total_leakage: f64,
    pub peak_dynamic: f64,
    pub subthreshold_leakage: f64,
    pub gate_leakage: f64,
    pub runtime_dynamic: f64,
}

impl PowerSummary {
    pub fn new(peak: &PowerRecord, runtime: &PowerRecord, power_gating: bool, long_channel: bool) -> Self {
        let subthreshold = if power_gating {
            peak.gated_leakage(long_channel)
        } else {
            peak.subthreshold_leakage(long_channel)
        };
        let total_leakage = subthreshold + peak.gate_leakage;
        Self {
            peak_power: peak.total_dynamic() + total_leakage,
            total_leakage,
            peak_dynamic: peak.total_dynamic(),
            subthreshold_leakage: subthreshold,
            gate_leakage: peak.gate_leakage,
            runtime_dynamic: runtime.total_dynamic(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub tech_node_nm: u32,
    pub area_mm2: f64,
    pub power: PowerSummary,
    pub rounds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub kind: SubsystemKind,
    pub label: &'static str,
    pub instances: usize,
    pub replication: usize,
    pub homogeneous: bool,
    pub area_mm2: f64,
    pub power: PowerSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafEntry {
    pub name: String,
    pub kind: SubsystemKind,
    pub area_mm2: f64,
    pub power: PowerSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub value: f64,
}

impl ReportRow {
    fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChipReport {
    pub device: DeviceSummary,
    pub groups: Vec<GroupSummary>,
    pub leaves: Vec<LeafEntry>,
}

/// Read-only view over an evaluated engine. Ordering is fixed: groups in
/// build order, units core-major within that.
pub struct Report<'a> {
    engine: &'a CompositionEngine,
}

impl<'a> Report<'a> {
    pub fn new(engine: &'a CompositionEngine) -> Self {
        Self { engine }
    }

    fn flags(&self) -> (bool, bool) {
        let system = &self.engine.conf().system;
        (system.power_gating, system.longer_channel_device)
    }

    fn summary(&self, peak: &PowerRecord, runtime: &PowerRecord) -> PowerSummary {
        let (pg, lc) = self.flags();
        PowerSummary::new(peak, runtime, pg, lc)
    }

    pub fn device(&self) -> DeviceSummary {
        let system = &self.engine.conf().system;
        DeviceSummary {
            name: system.name.clone(),
            tech_node_nm: system.tech_node_nm,
            area_mm2: self.engine.area().total,
            power: self.summary(&self.engine.power(), &self.engine.runtime_power()),
            rounds: self.engine.rounds(),
        }
    }

    pub fn groups(&self) -> Vec<GroupSummary> {
        self.engine
            .groups()
            .iter()
            .map(|g| GroupSummary {
                kind: g.kind(),
                label: g.kind().label(),
                instances: g.instance_count(),
                replication: g.replication_count(),
                homogeneous: g.is_homogeneous(),
                area_mm2: g.aggregate_area().total,
                power: self.summary(&g.aggregate_power(), &g.aggregate_runtime_power()),
            })
            .collect()
    }

    pub fn leaves(&self) -> Vec<LeafEntry> {
        let mut out = vec![];
        for group in self.engine.groups() {
            for (r, instance) in units(group) {
                let peak = group.per_unit(instance, instance.peak(), EvalMode::Peak);
                let runtime = group.per_unit(instance, instance.runtime(), EvalMode::Runtime);
                out.push(LeafEntry {
                    name: leaf_name(group.kind(), r),
                    kind: group.kind(),
                    area_mm2: instance.area().total,
                    power: self.summary(&peak, &runtime),
                });
            }
        }
        out
    }

    /// Flat `{name, value}` power columns for `mode`: per-core components
    /// with their remainder, then one column per other group, then the
    /// custom block.
    pub fn power_rows(&self, mode: EvalMode) -> Vec<ReportRow> {
        let (pg, lc) = self.flags();
        let mut rows = vec![];
        for group in self.engine.groups() {
            if group.kind() != SubsystemKind::Core {
                rows.push(ReportRow::new(group.kind().tag(), group_record(group, mode).reported(pg, lc)));
                continue;
            }
            for (r, instance) in units(group) {
                let whole = group.per_unit(instance, instance.record(mode), mode);
                let mut parts = PowerRecord::zero();
                for component in instance.components(mode) {
                    let power = group.per_unit(instance, &component.power, mode);
                    rows.push(ReportRow::new(
                        format!("{}_{}", leaf_name(SubsystemKind::Core, r), abbreviate(&component.name)),
                        power.reported(pg, lc),
                    ));
                    parts += power;
                }
                rows.push(ReportRow::new(
                    format!("{}_Other", leaf_name(SubsystemKind::Core, r)),
                    whole.saturating_sub(&parts).reported(pg, lc),
                ));
            }
        }
        if let Some(custom) = self.engine.custom_block() {
            rows.push(ReportRow::new(custom.name(), custom.power().reported(pg, lc)));
        }
        rows
    }

    /// Same columns as [`Report::power_rows`], in mm^2.
    pub fn area_rows(&self) -> Vec<ReportRow> {
        let mut rows = vec![];
        for group in self.engine.groups() {
            if group.kind() != SubsystemKind::Core {
                rows.push(ReportRow::new(group.kind().tag(), group.aggregate_area().total));
                continue;
            }
            for (r, instance) in units(group) {
                let mut parts = 0.0;
                for component in instance.components(EvalMode::Peak) {
                    rows.push(ReportRow::new(
                        format!("{}_{}", leaf_name(SubsystemKind::Core, r), abbreviate(&component.name)),
                        component.area.total,
                    ));
                    parts += component.area.total;
                }
                rows.push(ReportRow::new(
                    format!("{}_Other", leaf_name(SubsystemKind::Core, r)),
                    clamp_derived(instance.area().total - parts),
                ));
            }
        }
        if let Some(custom) = self.engine.custom_block() {
            rows.push(ReportRow::new(custom.name(), custom.area().total));
        }
        rows
    }

    pub fn snapshot(&self) -> ChipReport {
        ChipReport {
            device: self.device(),
            groups: self.groups(),
            leaves: self.leaves(),
        }
    }

    /// Text rendering. `plevel` 0 shows the device, 1 adds groups, 2 adds
    /// every unit.
    pub fn render(&self, plevel: u32) -> Result<String, EstimateError> {
        let conf = self.engine.conf();
        let device_type = conf.device_type()?;
        let projection = conf.interconnect_projection()?;
        let rule = "*".repeat(72);
        let mut out = String::new();

        line(&mut out, 0, format!("{} results (print level {})", conf.system.name, plevel));
        line(&mut out, 0, &rule);
        line(&mut out, 2, format!("Technology {} nm", conf.system.tech_node_nm));
        line(&mut out, 2, format!("Device type: {}", device_type.describe()));
        if conf.system.longer_channel_device {
            line(&mut out, 2, "Using long channel devices when appropriate");
        }
        line(&mut out, 2, format!("Interconnect: {}", projection.describe()));
        line(&mut out, 2, format!("Core clock rate (MHz) {}", conf.system.clock_rate_mhz));
        line(&mut out, 0, &rule);

        let device = self.device();
        line(&mut out, 0, "Processor:");
        summary_lines(&mut out, 2, device.area_mm2, &device.power);

        if plevel >= 1 {
            for group in self.groups() {
                out.push('\n');
                line(
                    &mut out,
                    2,
                    format!("Total {}: {} unit(s)", group.label, group.replication),
                );
                summary_lines(&mut out, 4, group.area_mm2, &group.power);
            }
            if let Some(custom) = self.engine.custom_block() {
                out.push('\n');
                line(&mut out, 2, format!("{}:", custom.name()));
                let p = custom.power();
                summary_lines(&mut out, 4, custom.area().total, &self.summary(&p, &p));
            }
        }

        if plevel >= 2 {
            out.push('\n');
            line(&mut out, 0, &rule);
            for leaf in self.leaves() {
                line(&mut out, 2, format!("{}:", leaf.name));
                summary_lines(&mut out, 4, leaf.area_mm2, &leaf.power);
            }
        }
        Ok(out)
    }
}

fn line(out: &mut String, indent: usize, text: impl Display) {
    out.push_str(&format!("{:indent$}{}\n", "", text, indent = indent));
}

fn summary_lines(out: &mut String, indent: usize, area_mm2: f64, p: &PowerSummary) {
    line(out, indent, format!("Area = {:.5} mm^2", area_mm2));
    line(out, indent, format!("Peak Power = {:.5} W", p.peak_power));
    line(out, indent, format!("Total Leakage = {:.5} W", p.total_leakage));
    line(out, indent, format!("Peak Dynamic = {:.5} W", p.peak_dynamic));
    line(out, indent, format!("Subthreshold Leakage = {:.5} W", p.subthreshold_leakage));
    line(out, indent, format!("Gate Leakage = {:.5} W", p.gate_leakage));
    line(out, indent, format!("Runtime Dynamic = {:.5} W", p.runtime_dynamic));
}
