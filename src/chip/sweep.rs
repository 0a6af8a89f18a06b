use std::sync::Arc;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::chip::engine::CompositionEngine;
use crate::chip::kind::SubsystemKind;
use crate::chip::report::PowerSummary;
use crate::sim::config::{ChipConfig, UnitParams};
use crate::sim::error::EstimateError;

/// Operating-point sweep over a built engine. Only clocks and activity vary,
/// so every point reuses the same tree.
#[derive(Debug, Clone, Copy)]
pub struct SweepSpec {
    pub points: usize,
    pub seed: u64,
    pub clock_scale: (f64, f64),
    pub activity_scale: (f64, f64),
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self {
            points: 8,
            seed: 0,
            clock_scale: (0.5, 1.5),
            activity_scale: (0.5, 1.5),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub index: usize,
    pub clock_scale: f64,
    pub activity_scale: f64,
    pub area_mm2: f64,
    pub power: PowerSummary,
}

fn check_range(what: &str, (lo, hi): (f64, f64)) -> Result<(), EstimateError> {
    if lo <= 0.0 || hi < lo {
        return Err(EstimateError::invalid(
            "sweep",
            format!("{} range [{}, {}] must be positive and ordered", what, lo, hi),
        ));
    }
    Ok(())
}

fn draw(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

fn scale_unit(unit: &mut UnitParams, clock: f64, activity: f64) {
    unit.clock_rate_mhz *= clock;
    unit.runtime_accesses *= activity;
    unit.duty_cycle = (unit.duty_cycle * activity).min(1.0);
    for block in unit.blocks.iter_mut() {
        block.runtime_accesses *= activity;
    }
}

/// `base` with every clock scaled by `clock` and every runtime activity
/// figure by `activity`. Structure is untouched.
pub fn perturb(base: &ChipConfig, clock: f64, activity: f64) -> ChipConfig {
    let mut conf = base.clone();
    conf.system.clock_rate_mhz *= clock;
    for kind in SubsystemKind::ALL {
        for unit in conf.group_mut(kind).units.iter_mut() {
            scale_unit(unit, clock, activity);
        }
    }
    conf.custom_block.frequency_mhz *= clock;
    conf.custom_block.activation_factor = (conf.custom_block.activation_factor * activity).min(1.0);
    conf
}

pub fn run_sweep(
    engine: &mut CompositionEngine,
    base: &ChipConfig,
    spec: &SweepSpec,
) -> Result<Vec<SweepPoint>, EstimateError> {
    check_range("clock scale", spec.clock_scale)?;
    check_range("activity scale", spec.activity_scale)?;
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut points = Vec::with_capacity(spec.points);
    for index in 0..spec.points {
        let clock_scale = draw(&mut rng, spec.clock_scale);
        let activity_scale = draw(&mut rng, spec.activity_scale);
        engine.evaluate_with(Some(Arc::new(perturb(base, clock_scale, activity_scale))))?;
        let device = engine.report().device();
        info!(
            "sweep point {}: clock x{:.3}, activity x{:.3}, peak {:.4} W",
            index, clock_scale, activity_scale, device.power.peak_power
        );
        points.push(SweepPoint {
            index,
            clock_scale,
            activity_scale,
            area_mm2: device.area_mm2,
            power: device.power,
        });
    }
    Ok(points)
}
