use log::{debug, trace};

use crate::chip::kind::{strategy_for, Normalization, SubsystemKind};
use crate::leaf::{Component, EvalMode, LeafModel, ModelFactory};
use crate::power::{AreaRecord, PowerRecord};
use crate::sim::config::{BlockParams, ChipConfig, UnitParams};
use crate::sim::error::EstimateError;

const NJ: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Unit,
    /// Shared wires spanning `length_mm`, plus the unit's own logic.
    Bus { length_mm: f64 },
    /// Link-only model attached to a router.
    GlobalLink { length_mm: f64 },
}

/// Table-driven leaf: every figure comes straight from [`UnitParams`].
///
/// Geometry is fixed at construction. [`LeafModel::refresh`] only re-reads
/// the operating parameters (clock, activity, leakage), never the areas.
#[derive(Debug)]
pub struct ParametricModel {
    name: String,
    shape: Shape,
    normalization: Normalization,
    params: UnitParams,
    clock_hz: f64,
    area: AreaRecord,
    block_areas: Vec<AreaRecord>,
    /// A private L2 folded into its core.
    private_cache: Option<Box<ParametricModel>>,
    last_peak: PowerRecord,
    last_runtime: PowerRecord,
}

fn check_params(who: &str, params: &UnitParams) -> Result<(), EstimateError> {
    if params.area_mm2 < 0.0 || params.blocks.iter().any(|b| b.area_mm2 < 0.0) {
        return Err(EstimateError::invalid(who, "area must not be negative"));
    }
    if params.link_area_per_mm < 0.0 {
        return Err(EstimateError::invalid(who, "link area must not be negative"));
    }
    Ok(())
}

impl ParametricModel {
    fn new(
        name: String,
        shape: Shape,
        normalization: Normalization,
        params: UnitParams,
        clock_hz: f64,
    ) -> Result<Self, EstimateError> {
        check_params(&name, &params)?;
        let block_areas: Vec<AreaRecord> = params
            .blocks
            .iter()
            .map(|b| AreaRecord::new(b.area_mm2, params.aspect_ratio))
            .collect();
        let own = match shape {
            Shape::Unit => params.area_mm2,
            Shape::Bus { length_mm } => params.area_mm2 + params.link_area_per_mm * length_mm,
            Shape::GlobalLink { length_mm } => params.link_area_per_mm * length_mm,
        };
        let blocks_total: f64 = block_areas.iter().map(|a| a.total).sum();
        let area = AreaRecord::new(own + blocks_total, params.aspect_ratio);
        debug!("built {} ({:?}): {:.4} mm^2", name, shape, area.total);
        Ok(Self {
            name,
            shape,
            normalization,
            params,
            clock_hz,
            area,
            block_areas,
            private_cache: None,
            last_peak: PowerRecord::default(),
            last_runtime: PowerRecord::default(),
        })
    }

    pub fn unit(kind: SubsystemKind, index: usize, conf: &ChipConfig) -> Result<Self, EstimateError> {
        let params = conf.group(kind).unit(index);
        let clock_hz = params.clock_hz(&conf.system);
        let name = unit_name(kind, index, &params);
        let mut model = Self::new(name, Shape::Unit, strategy_for(kind).normalization(), params, clock_hz)?;
        if kind == SubsystemKind::Core && conf.system.private_l2 {
            let mut cache = Self::unit(SubsystemKind::L2, index, conf)?;
            // the private slice runs off its core's clock
            cache.clock_hz = clock_hz;
            model.area += cache.area;
            model.private_cache = Some(Box::new(cache));
        }
        Ok(model)
    }

    pub fn bus(index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Self, EstimateError> {
        let params = conf.noc.unit(index);
        let clock_hz = params.clock_hz(&conf.system);
        let name = unit_name(SubsystemKind::Noc, index, &params);
        Self::new(name, Shape::Bus { length_mm }, Normalization::Clocked, params, clock_hz)
    }

    pub fn global_link(index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Self, EstimateError> {
        let mut params = conf.noc.unit(index);
        params.blocks.clear();
        let clock_hz = params.clock_hz(&conf.system);
        let name = format!("{}_link", unit_name(SubsystemKind::Noc, index, &params));
        Self::new(name, Shape::GlobalLink { length_mm }, Normalization::Clocked, params, clock_hz)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    fn link_length(&self) -> f64 {
        match self.shape {
            Shape::Unit => 0.0,
            Shape::Bus { length_mm } | Shape::GlobalLink { length_mm } => length_mm,
        }
    }

    /// Dynamic energy (or power for absolute units) of `energy_j` per access.
    fn activity(&self, energy_j: f64, peak_apc: f64, runtime_accesses: f64, mode: EvalMode) -> f64 {
        let t = self.params.execution_time_s;
        match (self.normalization, mode) {
            (Normalization::Absolute, EvalMode::Peak) => energy_j * peak_apc * self.clock_hz,
            (Normalization::Absolute, EvalMode::Runtime) => {
                if t > 0.0 {
                    energy_j * runtime_accesses / t
                } else {
                    0.0
                }
            }
            (Normalization::Duty, EvalMode::Runtime) => energy_j * peak_apc * self.params.duty_cycle,
            (_, EvalMode::Peak) => energy_j * peak_apc,
            (Normalization::Clocked, EvalMode::Runtime) => energy_j * runtime_accesses,
        }
    }

    fn leakage_family(&self, leakage: f64, gate_leakage: f64) -> PowerRecord {
        let lc = self.params.long_channel_ratio;
        let pg = self.params.power_gating_ratio;
        PowerRecord {
            leakage,
            long_channel_leakage: leakage * lc,
            gate_leakage,
            power_gated_leakage: leakage * pg,
            power_gated_long_channel_leakage: leakage * lc * pg,
            ..PowerRecord::default()
        }
    }

    fn block_power(&self, block: &BlockParams, mode: EvalMode) -> PowerRecord {
        let mut record = self.leakage_family(block.leakage_w, block.gate_leakage_w);
        record.dynamic = self.activity(
            block.energy_per_access_nj * NJ,
            block.peak_accesses_per_cycle,
            block.runtime_accesses,
            mode,
        );
        record
    }

    fn own_power(&self, mode: EvalMode) -> PowerRecord {
        let p = &self.params;
        let length = self.link_length();
        let (energy, leakage) = match self.shape {
            Shape::Unit => (p.energy_per_access_nj, p.leakage_w),
            Shape::Bus { .. } => (
                p.energy_per_access_nj + p.link_energy_per_mm_nj * length,
                p.leakage_w + p.link_leakage_per_mm_w * length,
            ),
            Shape::GlobalLink { .. } => (p.link_energy_per_mm_nj * length, p.link_leakage_per_mm_w * length),
        };
        let gate = match self.shape {
            Shape::GlobalLink { .. } => 0.0,
            _ => p.gate_leakage_w,
        };
        let mut record = self.leakage_family(leakage, gate);
        record.dynamic = self.activity(energy * NJ, p.peak_accesses_per_cycle, p.runtime_accesses, mode);
        if self.shape == Shape::Unit {
            record.runtime_dynamic = p.fixed_dynamic_w;
        }
        record
    }
}

fn unit_name(kind: SubsystemKind, index: usize, params: &UnitParams) -> String {
    params
        .name
        .clone()
        .unwrap_or_else(|| format!("{}{}", kind.tag(), index))
}

impl LeafModel for ParametricModel {
    fn area(&self) -> AreaRecord {
        self.area
    }

    fn power(&mut self, mode: EvalMode) -> PowerRecord {
        let mut record = self.own_power(mode);
        for block in &self.params.blocks {
            record += self.block_power(block, mode);
        }
        if let Some(cache) = self.private_cache.as_mut() {
            record += cache.power(mode);
        }
        trace!("{} {:?}: {:?}", self.name, mode, record);
        match mode {
            EvalMode::Peak => self.last_peak = record,
            EvalMode::Runtime => self.last_runtime = record,
        }
        record
    }

    fn clock_rate(&self) -> f64 {
        self.clock_hz
    }

    fn execution_time(&self) -> f64 {
        self.params.execution_time_s
    }

    fn components(&self, mode: EvalMode) -> Vec<Component> {
        let mut out: Vec<Component> = self
            .params
            .blocks
            .iter()
            .zip(self.block_areas.iter())
            .map(|(block, area)| Component {
                name: block.name.clone(),
                area: *area,
                power: self.block_power(block, mode),
            })
            .collect();
        if let Some(cache) = self.private_cache.as_ref() {
            let power = match mode {
                EvalMode::Peak => cache.last_peak,
                EvalMode::Runtime => cache.last_runtime,
            };
            out.push(Component {
                name: "L2".to_string(),
                area: cache.area,
                power,
            });
        }
        out
    }

    fn refresh(&mut self, conf: &ChipConfig, kind: SubsystemKind, index: usize) -> Result<(), EstimateError> {
        let mut params = conf.group(kind).unit(index);
        if matches!(self.shape, Shape::GlobalLink { .. }) {
            params.blocks.clear();
        }
        if params.blocks.len() != self.block_areas.len() {
            return Err(EstimateError::inconsistent(format!(
                "{} was built with {} blocks, refreshed configuration has {}",
                self.name,
                self.block_areas.len(),
                params.blocks.len()
            )));
        }
        self.clock_hz = params.clock_hz(&conf.system);
        self.params = params;
        if let Some(cache) = self.private_cache.as_mut() {
            cache.refresh(conf, SubsystemKind::L2, index)?;
            cache.clock_hz = self.clock_hz;
        }
        Ok(())
    }
}

/// The stock factory: every leaf is a [`ParametricModel`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ParametricFactory;

impl ModelFactory for ParametricFactory {
    fn build(&self, kind: SubsystemKind, index: usize, conf: &ChipConfig) -> Result<Box<dyn LeafModel>, EstimateError> {
        Ok(Box::new(ParametricModel::unit(kind, index, conf)?))
    }

    fn build_bus(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError> {
        Ok(Box::new(ParametricModel::bus(index, conf, length_mm)?))
    }

    fn build_global_link(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError> {
        Ok(Box::new(ParametricModel::global_link(index, conf, length_mm)?))
    }
}
