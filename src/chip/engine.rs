use std::sync::Arc;

use log::{debug, info, warn};
use num_traits::Zero;

use crate::base::behavior::*;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::chip::group::SubsystemGroup;
use crate::chip::kind::{strategy_for, BuildContext, KindStrategy, SubsystemKind};
use crate::chip::report::Report;
use crate::leaf::{CustomBlock, DefaultFormula, ModelFactory, ParametricFactory, PowerFormula};
use crate::power::{AreaRecord, PowerRecord};
use crate::sim::config::ChipConfig;
use crate::sim::error::EstimateError;

#[derive(Debug, Default)]
pub struct EngineState {
    pub area: AreaRecord,
    pub power: PowerRecord,
    pub rt_power: PowerRecord,
    pub rounds: u64,
}

/// Device-level aggregator. The tree of groups and instances is fixed when
/// the engine is built; evaluation only recomputes power.
pub struct CompositionEngine {
    base: ModuleBase<EngineState, ChipConfig>,
    groups: Vec<SubsystemGroup>,
    custom: Option<CustomBlock>,
}

module!(CompositionEngine, EngineState, ChipConfig,);

impl CompositionEngine {
    pub fn build(conf: Arc<ChipConfig>) -> Result<Self, EstimateError> {
        Self::build_with(conf, Arc::new(ParametricFactory), Arc::new(DefaultFormula))
    }

    /// Validates everything up front, so a failed build leaves nothing behind.
    pub fn build_with(
        conf: Arc<ChipConfig>,
        factory: Arc<dyn ModelFactory>,
        formula: Arc<dyn PowerFormula>,
    ) -> Result<Self, EstimateError> {
        info!("building {}", conf.system.name);
        conf.device_type()?;
        conf.interconnect_projection()?;
        let strategies: Vec<Box<dyn KindStrategy>> =
            SubsystemKind::ALL.iter().map(|&kind| strategy_for(kind)).collect();
        for strategy in &strategies {
            strategy.validate(&conf)?;
        }

        let custom = if conf.custom_block.count > 0 {
            Some(CustomBlock::new(Arc::clone(&conf), formula)?)
        } else {
            None
        };
        let mut area = custom.as_ref().map(|c| c.area()).unwrap_or_else(AreaRecord::zero);

        let mut groups = Vec::new();
        for strategy in strategies {
            let ctx = BuildContext {
                conf: &conf,
                factory: &factory,
                device_area: area.total,
            };
            if let Some(group) = SubsystemGroup::build(strategy, &ctx)? {
                area += group.aggregate_area();
                groups.push(group);
            }
        }

        // global links see the whole device, interconnect included
        for group in groups.iter_mut() {
            let ctx = BuildContext {
                conf: &conf,
                factory: &factory,
                device_area: area.total,
            };
            area += group.attach_links(&ctx)?;
        }
        info!("{}: {} groups, {:.3} mm^2", conf.system.name, groups.len(), area.total);

        let mut me = Self {
            base: ModuleBase::named(conf.system.name.clone()),
            groups,
            custom,
        };
        me.base.state.area = area;
        me.init_conf(conf);
        Ok(me)
    }

    /// Evaluate, first swapping in `conf` when one is given.
    pub fn evaluate_with(&mut self, conf: Option<Arc<ChipConfig>>) -> Result<(), EstimateError> {
        if let Some(conf) = conf {
            self.refresh(conf)?;
            self.reset()?;
        }
        self.evaluate()
    }

    /// Swap operating parameters without touching structure. A configuration
    /// that would change the tree's shape is rejected and nothing changes.
    pub fn refresh(&mut self, conf: Arc<ChipConfig>) -> Result<(), EstimateError> {
        if conf.structure() != self.conf().structure() {
            return Err(EstimateError::inconsistent(
                "refreshed configuration changes the built structure, rebuild instead",
            ));
        }
        conf.device_type()?;
        conf.interconnect_projection()?;
        for group in &self.groups {
            strategy_for(group.kind()).validate(&conf)?;
        }
        if let Err(err) = self.refresh_children(&conf) {
            // leaves may reject a refresh after their siblings took it
            if let Some(previous) = self.conf_arc() {
                if let Err(again) = self.refresh_children(&previous) {
                    warn!("{}: rollback after failed refresh also failed: {}", self.name(), again);
                }
            }
            return Err(err);
        }
        debug!("{}: configuration refreshed", self.name());
        self.refresh_conf(conf);
        Ok(())
    }

    fn refresh_children(&mut self, conf: &Arc<ChipConfig>) -> Result<(), EstimateError> {
        if let Some(custom) = self.custom.as_mut() {
            custom.refresh(Arc::clone(conf))?;
        }
        for group in self.groups.iter_mut() {
            group.refresh(Arc::clone(conf))?;
        }
        Ok(())
    }

    pub fn area(&self) -> AreaRecord {
        self.state().area
    }

    pub fn power(&self) -> PowerRecord {
        self.state().power
    }

    pub fn runtime_power(&self) -> PowerRecord {
        self.state().rt_power
    }

    /// Completed evaluation rounds.
    pub fn rounds(&self) -> u64 {
        self.state().rounds
    }

    pub fn groups(&self) -> &[SubsystemGroup] {
        &self.groups
    }

    pub fn group(&self, kind: SubsystemKind) -> Option<&SubsystemGroup> {
        self.groups.iter().find(|g| g.kind() == kind)
    }

    pub fn custom_block(&self) -> Option<&CustomBlock> {
        self.custom.as_ref()
    }

    pub fn report(&self) -> Report<'_> {
        Report::new(self)
    }
}

impl ModuleBehaviors for CompositionEngine {
    fn evaluate(&mut self) -> Result<(), EstimateError> {
        let mut power = PowerRecord::zero();
        let mut rt_power = PowerRecord::zero();
        for group in self.groups.iter_mut() {
            group.evaluate()?;
            power += group.aggregate_power();
            rt_power += group.aggregate_runtime_power();
        }
        if let Some(custom) = self.custom.as_mut() {
            custom.evaluate()?;
            power += custom.power();
            rt_power += custom.power();
        }
        let state = self.state_mut();
        state.power = power;
        state.rt_power = rt_power;
        state.rounds += 1;
        info!(
            "{}: round {}, peak {:.4} W, runtime {:.4} W",
            self.name(),
            self.rounds(),
            power.total_dynamic() + power.leakage + power.gate_leakage,
            rt_power.total_dynamic() + rt_power.leakage + rt_power.gate_leakage
        );
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EstimateError> {
        for group in self.groups.iter_mut() {
            group.reset()?;
        }
        if let Some(custom) = self.custom.as_mut() {
            custom.reset()?;
        }
        let state = self.state_mut();
        state.power = PowerRecord::zero();
        state.rt_power = PowerRecord::zero();
        Ok(())
    }
}
