use std::sync::Arc;

use log::debug;

use crate::base::behavior::*;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::power::{clamp_derived, AreaRecord, PowerRecord};
use crate::sim::config::{ChipConfig, CustomBlockConfig, CustomMode};
use crate::sim::error::EstimateError;

/// Switching-power formulas of the fixed-function block. Watts in, watts out.
pub trait PowerFormula: Send + Sync {
    fn by_frequency(&self, static_w: f64, frequency_hz: f64, activation: f64, energy_j: f64) -> f64 {
        static_w + frequency_hz * activation * energy_j
    }

    fn by_interval(&self, static_w: f64, switches: u64, energy_j: f64, interval_s: f64) -> f64 {
        static_w + switches as f64 * energy_j / interval_s
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFormula;

impl PowerFormula for DefaultFormula {}

#[derive(Debug, Default)]
pub struct CustomState {
    pub area: AreaRecord,
    pub power: PowerRecord,
}

pub struct CustomBlock {
    base: ModuleBase<CustomState, ChipConfig>,
    formula: Arc<dyn PowerFormula>,
}

module!(CustomBlock, CustomState, ChipConfig,);

fn check(conf: &CustomBlockConfig) -> Result<(), EstimateError> {
    if conf.mode == CustomMode::Interval && conf.interval_s <= 0.0 {
        return Err(EstimateError::invalid(conf.name.clone(), "interval must be positive"));
    }
    if conf.area_mm2 < 0.0 {
        return Err(EstimateError::invalid(conf.name.clone(), "area must not be negative"));
    }
    Ok(())
}

impl CustomBlock {
    pub fn new(conf: Arc<ChipConfig>, formula: Arc<dyn PowerFormula>) -> Result<Self, EstimateError> {
        let block = &conf.custom_block;
        check(block)?;
        let mut me = Self {
            base: ModuleBase::named(block.name.clone()),
            formula,
        };
        me.base.state.area = AreaRecord::new(block.area_mm2, 1.0) * block.count as f64;
        me.init_conf(conf);
        Ok(me)
    }

    pub fn area(&self) -> AreaRecord {
        self.state().area
    }

    pub fn power(&self) -> PowerRecord {
        self.state().power
    }

    /// Static part goes to every leakage field, the switching part to
    /// runtime_dynamic.
    fn split(&self) -> PowerRecord {
        let block = &self.conf().custom_block;
        let energy = block.switching_energy_nj * 1e-9;
        let total = match block.mode {
            CustomMode::Frequency => self.formula.by_frequency(
                block.static_power_w,
                block.frequency_mhz * 1e6,
                block.activation_factor,
                energy,
            ),
            CustomMode::Interval => {
                self.formula
                    .by_interval(block.static_power_w, block.switch_count, energy, block.interval_s)
            }
        };
        let n = block.count as f64;
        let stat = block.static_power_w * n;
        PowerRecord {
            leakage: stat,
            long_channel_leakage: stat,
            power_gated_leakage: stat,
            power_gated_long_channel_leakage: stat,
            runtime_dynamic: clamp_derived(total - block.static_power_w) * n,
            ..PowerRecord::default()
        }
    }

    pub fn refresh(&mut self, conf: Arc<ChipConfig>) -> Result<(), EstimateError> {
        check(&conf.custom_block)?;
        self.refresh_conf(conf);
        Ok(())
    }
}

impl ModuleBehaviors for CustomBlock {
    fn evaluate(&mut self) -> Result<(), EstimateError> {
        let power = self.split();
        debug!("{}: {:?}", self.name(), power);
        self.state_mut().power = power;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EstimateError> {
        self.state_mut().power.reset();
        Ok(())
    }
}
