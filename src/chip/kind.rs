use std::fmt;
use std::sync::Arc;

use num_traits::Zero;
use serde::Serialize;

use crate::chip::instance::{link_length, Geometry, Instance};
use crate::leaf::{EvalMode, ModelFactory};
use crate::power::{AreaRecord, ScalingTuple};
use crate::sim::config::{ChipConfig, NocTopology};
use crate::sim::error::EstimateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    Core,
    L2,
    L3,
    L1Directory,
    L2Directory,
    MemoryController,
    FlashController,
    NetworkInterface,
    Pcie,
    Noc,
}

impl SubsystemKind {
    /// Build, evaluation and report order. The interconnect comes last since
    /// it is sized from the area of everything before it.
    pub const ALL: [SubsystemKind; 10] = [
        SubsystemKind::Core,
        SubsystemKind::L2,
        SubsystemKind::L3,
        SubsystemKind::L1Directory,
        SubsystemKind::L2Directory,
        SubsystemKind::MemoryController,
        SubsystemKind::FlashController,
        SubsystemKind::NetworkInterface,
        SubsystemKind::Pcie,
        SubsystemKind::Noc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SubsystemKind::Core => "Cores",
            SubsystemKind::L2 => "L2s",
            SubsystemKind::L3 => "L3s",
            SubsystemKind::L1Directory => "First Level Directories",
            SubsystemKind::L2Directory => "Second Level Directories",
            SubsystemKind::MemoryController => "Memory Controllers",
            SubsystemKind::FlashController => "Flash/SSD Controllers",
            SubsystemKind::NetworkInterface => "Network Interface Units",
            SubsystemKind::Pcie => "PCIe Controllers",
            SubsystemKind::Noc => "NoCs (Network/Bus)",
        }
    }

    /// Short prefix used for report column names.
    pub fn tag(&self) -> &'static str {
        match self {
            SubsystemKind::Core => "C",
            SubsystemKind::L2 => "L2",
            SubsystemKind::L3 => "L3",
            SubsystemKind::L1Directory => "L1Dir",
            SubsystemKind::L2Directory => "L2Dir",
            SubsystemKind::MemoryController => "MC",
            SubsystemKind::FlashController => "FC",
            SubsystemKind::NetworkInterface => "NIU",
            SubsystemKind::Pcie => "PCIe",
            SubsystemKind::Noc => "NoC",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What turns a leaf's dynamic energy into watts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Peak energy is per cycle, runtime energy is per run.
    Clocked,
    /// Both records are per-cycle energies; runtime is duty-cycle weighted.
    Duty,
    /// The leaf already reports watts.
    Absolute,
}

impl Normalization {
    pub fn rate(&self, mode: EvalMode, clock_rate: f64, execution_time: f64) -> f64 {
        match (self, mode) {
            (Normalization::Clocked, EvalMode::Peak) | (Normalization::Duty, _) => clock_rate,
            (Normalization::Clocked, EvalMode::Runtime) => 1.0 / execution_time,
            (Normalization::Absolute, _) => 1.0,
        }
    }
}

pub struct BuildContext<'a> {
    pub conf: &'a Arc<ChipConfig>,
    pub factory: &'a Arc<dyn ModelFactory>,
    /// Device area finalized so far, mm^2.
    pub device_area: f64,
}

/// Per-kind policy, picked once when the engine is built.
pub trait KindStrategy: Send + Sync {
    fn kind(&self) -> SubsystemKind;

    fn normalization(&self) -> Normalization {
        Normalization::Clocked
    }

    fn present(&self, conf: &ChipConfig) -> bool {
        conf.group(self.kind()).count > 0
    }

    fn homogeneous(&self, conf: &ChipConfig) -> bool {
        conf.group(self.kind()).homogeneous
    }

    fn replication(&self, conf: &ChipConfig) -> usize {
        conf.group(self.kind()).count
    }

    fn instances_needed(&self, conf: &ChipConfig) -> usize {
        if !self.present(conf) {
            0
        } else if self.homogeneous(conf) {
            1
        } else {
            self.replication(conf)
        }
    }

    fn validate(&self, conf: &ChipConfig) -> Result<(), EstimateError> {
        check_units(self, conf)
    }

    fn build(&self, ctx: &BuildContext) -> Result<Vec<Instance>, EstimateError> {
        let kind = self.kind();
        (0..self.instances_needed(ctx.conf))
            .map(|index| {
                let model = ctx.factory.build(kind, index, ctx.conf)?;
                Ok(Instance::new(kind, index, model, Geometry::Fixed, ctx))
            })
            .collect()
    }

    /// Second build pass, run once every group exists. Returns the area it
    /// added on top of the group's instances.
    fn attach_links(
        &self,
        _instances: &mut [Instance],
        _ctx: &BuildContext,
        _replication: f64,
    ) -> Result<AreaRecord, EstimateError> {
        Ok(AreaRecord::zero())
    }

    fn scaling(&self, instance: &Instance, replication: f64, mode: EvalMode) -> ScalingTuple {
        let rate = self
            .normalization()
            .rate(mode, instance.clock_rate(), instance.execution_time());
        ScalingTuple::replicated(rate, replication)
    }
}

fn check_units<S: KindStrategy + ?Sized>(strategy: &S, conf: &ChipConfig) -> Result<(), EstimateError> {
    let kind = strategy.kind();
    let group = conf.group(kind);
    if !strategy.present(conf) {
        return Ok(());
    }
    if !group.homogeneous && group.units.len() < group.count {
        return Err(EstimateError::inconsistent(format!(
            "{} declares {} heterogeneous units but only {} are configured",
            kind,
            group.count,
            group.units.len()
        )));
    }
    let normalization = strategy.normalization();
    for index in 0..strategy.instances_needed(conf) {
        let unit = group.unit(index);
        let who = format!("{}{}", kind.tag(), index);
        if normalization == Normalization::Clocked && unit.execution_time_s <= 0.0 {
            return Err(EstimateError::invalid(who, "execution time must be positive"));
        }
        if normalization != Normalization::Absolute && unit.clock_hz(&conf.system) <= 0.0 {
            return Err(EstimateError::invalid(who, "clock rate must be positive"));
        }
    }
    Ok(())
}

/// Cores, L3s and both directory levels.
pub struct StandardStrategy {
    kind: SubsystemKind,
}

impl KindStrategy for StandardStrategy {
    fn kind(&self) -> SubsystemKind {
        self.kind
    }
}

/// Shared L2 slices. With private L2s the slices live inside the cores.
pub struct SharedL2Strategy;

impl KindStrategy for SharedL2Strategy {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::L2
    }

    fn present(&self, conf: &ChipConfig) -> bool {
        !conf.system.private_l2 && conf.l2.count > 0
    }

    fn validate(&self, conf: &ChipConfig) -> Result<(), EstimateError> {
        if conf.system.private_l2 {
            if conf.l2.count != conf.cores.count {
                return Err(EstimateError::inconsistent(format!(
                    "number of private L2s ({}) does not match number of cores ({})",
                    conf.l2.count, conf.cores.count
                )));
            }
            if !conf.l2.homogeneous && conf.l2.units.len() < conf.l2.count {
                return Err(EstimateError::inconsistent(format!(
                    "{} private L2s declared heterogeneous but only {} are configured",
                    conf.l2.count,
                    conf.l2.units.len()
                )));
            }
            return Ok(());
        }
        check_units(self, conf)
    }
}

/// Memory, flash, network and PCIe controllers.
pub struct ControllerStrategy {
    kind: SubsystemKind,
    normalization: Normalization,
    needs_channels: bool,
}

impl KindStrategy for ControllerStrategy {
    fn kind(&self) -> SubsystemKind {
        self.kind
    }

    fn normalization(&self) -> Normalization {
        self.normalization
    }

    fn present(&self, conf: &ChipConfig) -> bool {
        let group = conf.group(self.kind);
        group.count > 0 && (!self.needs_channels || group.channels > 0)
    }
}

/// Routed networks and buses.
pub struct InterconnectStrategy;

impl KindStrategy for InterconnectStrategy {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Noc
    }

    fn validate(&self, conf: &ChipConfig) -> Result<(), EstimateError> {
        check_units(self, conf)?;
        for index in 0..self.instances_needed(conf) {
            let unit = conf.noc.unit(index);
            NocTopology::decode(unit.topology)?;
            if !(0.0..=1.0).contains(&unit.chip_coverage) {
                return Err(EstimateError::invalid(
                    format!("NoC{}", index),
                    format!("chip coverage {} outside [0, 1]", unit.chip_coverage),
                ));
            }
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext) -> Result<Vec<Instance>, EstimateError> {
        let conf = ctx.conf;
        let per_instance = if self.homogeneous(conf) {
            self.replication(conf) as f64
        } else {
            1.0
        };
        // each bus sees the area of the ones built before it
        let mut running = ctx.device_area;
        let mut instances = Vec::new();
        for index in 0..self.instances_needed(conf) {
            let unit = conf.noc.unit(index);
            let (model, geometry) = match NocTopology::decode(unit.topology)? {
                NocTopology::Router => (ctx.factory.build(SubsystemKind::Noc, index, conf)?, Geometry::Fixed),
                NocTopology::Bus => {
                    let length = link_length(running, unit.chip_coverage);
                    (
                        ctx.factory.build_bus(index, conf, length)?,
                        Geometry::Contextual { device_area: running },
                    )
                }
            };
            let instance = Instance::new(SubsystemKind::Noc, index, model, geometry, ctx);
            running += instance.area().total * per_instance;
            instances.push(instance);
        }
        Ok(instances)
    }

    fn attach_links(
        &self,
        instances: &mut [Instance],
        ctx: &BuildContext,
        replication: f64,
    ) -> Result<AreaRecord, EstimateError> {
        let mut running = ctx.device_area;
        let mut added = AreaRecord::zero();
        for instance in instances.iter_mut() {
            let unit = ctx.conf.noc.unit(instance.index());
            if !unit.has_global_link || NocTopology::decode(unit.topology)? != NocTopology::Router {
                continue;
            }
            let length = link_length(running, unit.chip_coverage);
            let model = ctx.factory.build_global_link(instance.index(), ctx.conf, length)?;
            let links = instance.attach_link(model, unit.total_nodes, running) * replication;
            running += links.total;
            added += links;
        }
        Ok(added)
    }
}

pub fn strategy_for(kind: SubsystemKind) -> Box<dyn KindStrategy> {
    match kind {
        SubsystemKind::Core
        | SubsystemKind::L3
        | SubsystemKind::L1Directory
        | SubsystemKind::L2Directory => Box::new(StandardStrategy { kind }),
        SubsystemKind::L2 => Box::new(SharedL2Strategy),
        SubsystemKind::MemoryController | SubsystemKind::Pcie => Box::new(ControllerStrategy {
            kind,
            normalization: if kind == SubsystemKind::Pcie {
                Normalization::Duty
            } else {
                Normalization::Clocked
            },
            needs_channels: true,
        }),
        SubsystemKind::NetworkInterface => Box::new(ControllerStrategy {
            kind,
            normalization: Normalization::Duty,
            needs_channels: false,
        }),
        SubsystemKind::FlashController => Box::new(ControllerStrategy {
            kind,
            normalization: Normalization::Absolute,
            needs_channels: false,
        }),
        SubsystemKind::Noc => Box::new(InterconnectStrategy),
    }
}
