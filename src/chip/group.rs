use std::sync::Arc;

use log::debug;
use num_traits::Zero;
use smallvec::SmallVec;

use crate::base::behavior::*;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::chip::instance::Instance;
use crate::chip::kind::{BuildContext, KindStrategy, SubsystemKind};
use crate::leaf::EvalMode;
use crate::power::{project, AreaRecord, PowerRecord};
use crate::sim::config::ChipConfig;
use crate::sim::error::EstimateError;

#[derive(Debug, Default)]
pub struct GroupState {
    pub area: AreaRecord,
    pub power: PowerRecord,
    pub rt_power: PowerRecord,
}

/// All instances of one subsystem kind.
///
/// A homogeneous group holds a single representative standing in for
/// `replication_count()` identical units; a heterogeneous one holds every
/// unit and sums them.
pub struct SubsystemGroup {
    base: ModuleBase<GroupState, ChipConfig>,
    strategy: Box<dyn KindStrategy>,
    instances: SmallVec<[Instance; 1]>,
    homogeneous: bool,
    replication: usize,
}

module!(SubsystemGroup, GroupState, ChipConfig,);

impl SubsystemGroup {
    /// `None` when the configuration leaves this kind out.
    pub fn build(strategy: Box<dyn KindStrategy>, ctx: &BuildContext) -> Result<Option<Self>, EstimateError> {
        let conf = ctx.conf;
        if !strategy.present(conf) {
            return Ok(None);
        }
        let instances: SmallVec<[Instance; 1]> = strategy.build(ctx)?.into_iter().collect();
        let mut me = Self {
            base: ModuleBase::named(strategy.kind().label()),
            homogeneous: strategy.homogeneous(conf),
            replication: strategy.replication(conf),
            strategy,
            instances,
        };
        me.init_conf(Arc::clone(conf));
        me.finalize_area();
        debug!(
            "built {}: {} instance(s), x{}, {:.4} mm^2",
            me.name(),
            me.instances.len(),
            me.multiplier(),
            me.state().area.total
        );
        Ok(Some(me))
    }

    fn multiplier(&self) -> f64 {
        if self.homogeneous {
            self.replication as f64
        } else {
            1.0
        }
    }

    fn finalize_area(&mut self) {
        let area = if self.homogeneous {
            self.instances
                .first()
                .map(|i| i.area() * self.replication as f64)
                .unwrap_or_else(AreaRecord::zero)
        } else {
            self.instances.iter().map(|i| i.area()).sum()
        };
        self.state_mut().area = area;
    }

    /// Second build pass. Returns the area it added.
    pub fn attach_links(&mut self, ctx: &BuildContext) -> Result<AreaRecord, EstimateError> {
        let replication = self.multiplier();
        let added = self.strategy.attach_links(&mut self.instances, ctx, replication)?;
        if !added.is_zero() {
            self.finalize_area();
        }
        Ok(added)
    }

    /// New operating parameters; instances are kept.
    pub fn refresh(&mut self, conf: Arc<ChipConfig>) -> Result<(), EstimateError> {
        for instance in self.instances.iter_mut() {
            instance.refresh(Arc::clone(&conf))?;
        }
        self.refresh_conf(conf);
        Ok(())
    }

    pub fn kind(&self) -> SubsystemKind {
        self.strategy.kind()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    /// Physical units represented, whatever the homogeneity.
    pub fn replication_count(&self) -> usize {
        self.replication
    }

    pub fn aggregate_area(&self) -> AreaRecord {
        self.state().area
    }

    pub fn aggregate_power(&self) -> PowerRecord {
        self.state().power
    }

    pub fn aggregate_runtime_power(&self) -> PowerRecord {
        self.state().rt_power
    }

    pub fn for_each_instance<F: FnMut(&Instance)>(&self, f: F) {
        self.instances.iter().for_each(f)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// `record`, taken from `instance`, normalized to watts for a single
    /// physical unit.
    pub fn per_unit(&self, instance: &Instance, record: &PowerRecord, mode: EvalMode) -> PowerRecord {
        project(record, &self.strategy.scaling(instance, 1.0, mode))
    }
}

impl ModuleBehaviors for SubsystemGroup {
    fn evaluate(&mut self) -> Result<(), EstimateError> {
        let replication = self.multiplier();
        let mut power = PowerRecord::zero();
        let mut rt_power = PowerRecord::zero();
        for instance in self.instances.iter_mut() {
            instance.evaluate()?;
            let peak = self.strategy.scaling(instance, replication, EvalMode::Peak);
            let runtime = self.strategy.scaling(instance, replication, EvalMode::Runtime);
            power += project(instance.peak(), &peak);
            rt_power += project(instance.runtime(), &runtime);
        }
        let state = self.state_mut();
        state.power = power;
        state.rt_power = rt_power;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EstimateError> {
        for instance in self.instances.iter_mut() {
            instance.reset()?;
        }
        let state = self.state_mut();
        state.power = PowerRecord::zero();
        state.rt_power = PowerRecord::zero();
        Ok(())
    }
}
