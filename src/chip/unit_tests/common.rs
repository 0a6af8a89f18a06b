use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chip::engine::CompositionEngine;
use crate::chip::kind::SubsystemKind;
use crate::leaf::{DefaultFormula, EvalMode, LeafModel, ModelFactory};
use crate::power::{AreaRecord, PowerRecord};
use crate::sim::config::{ChipConfig, GroupConfig, UnitParams};
use crate::sim::error::EstimateError;

/// Leaf whose raw figures are read verbatim from the unit parameters:
/// `energy_per_access_nj` is the peak dynamic per cycle, `runtime_accesses`
/// the runtime dynamic per run, and clocks stay in MHz. A refresh to a
/// negative leakage is refused.
pub struct StubModel {
    length: f64,
    link_only: bool,
    area: AreaRecord,
    peak: PowerRecord,
    runtime: PowerRecord,
    clock: f64,
    time: f64,
}

impl StubModel {
    fn new(conf: &ChipConfig, unit: &UnitParams, length: f64, link_only: bool) -> Self {
        let own = if link_only { 0.0 } else { unit.area_mm2 };
        let mut me = Self {
            length,
            link_only,
            area: AreaRecord::new(own + unit.link_area_per_mm * length, 1.0),
            peak: PowerRecord::default(),
            runtime: PowerRecord::default(),
            clock: 0.0,
            time: 0.0,
        };
        me.load(conf, unit);
        me
    }

    fn load(&mut self, conf: &ChipConfig, unit: &UnitParams) {
        let own = if self.link_only { 0.0 } else { 1.0 };
        let leakage = own * unit.leakage_w + unit.link_leakage_per_mm_w * self.length;
        let gate = own * unit.gate_leakage_w;
        self.peak = PowerRecord {
            dynamic: own * unit.energy_per_access_nj + unit.link_energy_per_mm_nj * self.length,
            leakage,
            long_channel_leakage: leakage,
            gate_leakage: gate,
            power_gated_leakage: leakage,
            power_gated_long_channel_leakage: leakage,
            runtime_dynamic: own * unit.fixed_dynamic_w,
        };
        self.runtime = PowerRecord {
            dynamic: own * unit.runtime_accesses,
            ..self.peak
        };
        self.clock = if unit.clock_rate_mhz > 0.0 {
            unit.clock_rate_mhz
        } else {
            conf.system.clock_rate_mhz
        };
        self.time = unit.execution_time_s;
    }
}

impl LeafModel for StubModel {
    fn area(&self) -> AreaRecord {
        self.area
    }

    fn power(&mut self, mode: EvalMode) -> PowerRecord {
        match mode {
            EvalMode::Peak => self.peak,
            EvalMode::Runtime => self.runtime,
        }
    }

    fn clock_rate(&self) -> f64 {
        self.clock
    }

    fn execution_time(&self) -> f64 {
        self.time
    }

    fn refresh(&mut self, conf: &ChipConfig, kind: SubsystemKind, index: usize) -> Result<(), EstimateError> {
        let unit = conf.group(kind).unit(index);
        if unit.leakage_w < 0.0 {
            return Err(EstimateError::invalid(format!("{}_{}", kind.tag(), index), "negative leakage"));
        }
        self.load(conf, &unit);
        Ok(())
    }
}

#[derive(Default)]
pub struct StubFactory {
    pub builds: AtomicUsize,
    pub bus_lengths: Mutex<Vec<f64>>,
    pub link_lengths: Mutex<Vec<f64>>,
}

impl StubFactory {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ModelFactory for StubFactory {
    fn build(&self, kind: SubsystemKind, index: usize, conf: &ChipConfig) -> Result<Box<dyn LeafModel>, EstimateError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubModel::new(conf, &conf.group(kind).unit(index), 0.0, false)))
    }

    fn build_bus(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.bus_lengths.lock().unwrap().push(length_mm);
        Ok(Box::new(StubModel::new(conf, &conf.noc.unit(index), length_mm, false)))
    }

    fn build_global_link(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.link_lengths.lock().unwrap().push(length_mm);
        Ok(Box::new(StubModel::new(conf, &conf.noc.unit(index), length_mm, true)))
    }
}

pub fn stub_engine(conf: ChipConfig) -> Result<(Arc<StubFactory>, CompositionEngine), EstimateError> {
    let factory = Arc::new(StubFactory::default());
    let engine = CompositionEngine::build_with(Arc::new(conf), factory.clone(), Arc::new(DefaultFormula))?;
    Ok((factory, engine))
}

pub fn unit(leakage_w: f64, dynamic: f64) -> UnitParams {
    UnitParams {
        leakage_w,
        energy_per_access_nj: dynamic,
        ..UnitParams::default()
    }
}

pub fn group(count: usize, homogeneous: bool, units: Vec<UnitParams>) -> GroupConfig {
    GroupConfig {
        count,
        homogeneous,
        units,
        ..GroupConfig::default()
    }
}

/// Two identical cores at 2000, each leaking 1 W with 0.5 dynamic per cycle.
pub fn two_cores() -> ChipConfig {
    let mut conf = ChipConfig::default();
    conf.cores = group(2, true, vec![UnitParams { area_mm2: 4.0, ..unit(1.0, 0.5) }]);
    conf
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1e-12)
}
