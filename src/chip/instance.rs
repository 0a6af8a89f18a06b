use std::sync::Arc;

use log::{debug, trace};
use num_traits::Zero;

use crate::base::behavior::*;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::chip::kind::{BuildContext, SubsystemKind};
use crate::leaf::{Component, EvalMode, LeafModel, ModelFactory};
use crate::power::{project, AreaRecord, PowerRecord, ScalingTuple};
use crate::sim::config::ChipConfig;
use crate::sim::error::EstimateError;

/// Wire length of an interconnect spanning `coverage` of a square die.
pub fn link_length(device_area: f64, coverage: f64) -> f64 {
    (device_area * coverage).max(0.0).sqrt()
}

/// How an instance's model depends on its surroundings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Fixed,
    /// Sized from the device area seen at build time; rebuilt on reset.
    Contextual { device_area: f64 },
}

/// Global links hanging off a router, one per node.
pub struct LinkBus {
    model: Box<dyn LeafModel>,
    nodes: usize,
    device_area: f64,
    area: AreaRecord,
}

impl LinkBus {
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Footprint of all links together.
    pub fn area(&self) -> AreaRecord {
        self.area * self.nodes as f64
    }
}

#[derive(Debug, Default)]
pub struct InstanceState {
    pub peak: PowerRecord,
    pub runtime: PowerRecord,
}

/// One leaf model inside a group, plus whatever the engine attached to it.
pub struct Instance {
    base: ModuleBase<InstanceState, ChipConfig>,
    kind: SubsystemKind,
    index: usize,
    model: Box<dyn LeafModel>,
    geometry: Geometry,
    /// Footprint finalized at build; survives model rebuilds.
    area: AreaRecord,
    link: Option<LinkBus>,
    factory: Arc<dyn ModelFactory>,
}

module!(Instance, InstanceState, ChipConfig,);

impl Instance {
    pub fn new(
        kind: SubsystemKind,
        index: usize,
        model: Box<dyn LeafModel>,
        geometry: Geometry,
        ctx: &BuildContext,
    ) -> Self {
        let mut me = Self {
            base: ModuleBase::named(format!("{}{}", kind.tag(), index)),
            kind,
            index,
            area: model.area(),
            model,
            geometry,
            link: None,
            factory: Arc::clone(ctx.factory),
        };
        me.init_conf(Arc::clone(ctx.conf));
        me
    }

    pub fn kind(&self) -> SubsystemKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn link(&self) -> Option<&LinkBus> {
        self.link.as_ref()
    }

    /// Own footprint plus attached links.
    pub fn area(&self) -> AreaRecord {
        match &self.link {
            Some(link) => self.area + link.area(),
            None => self.area,
        }
    }

    pub fn peak(&self) -> &PowerRecord {
        &self.state().peak
    }

    pub fn runtime(&self) -> &PowerRecord {
        &self.state().runtime
    }

    pub fn record(&self, mode: EvalMode) -> &PowerRecord {
        match mode {
            EvalMode::Peak => self.peak(),
            EvalMode::Runtime => self.runtime(),
        }
    }

    pub fn clock_rate(&self) -> f64 {
        self.model.clock_rate()
    }

    pub fn execution_time(&self) -> f64 {
        self.model.execution_time()
    }

    pub fn components(&self, mode: EvalMode) -> Vec<Component> {
        self.model.components(mode)
    }

    /// Hang `nodes` global links off this instance. Returns the links' total
    /// footprint.
    pub fn attach_link(&mut self, model: Box<dyn LeafModel>, nodes: usize, device_area: f64) -> AreaRecord {
        let link = LinkBus {
            area: model.area(),
            model,
            nodes,
            device_area,
        };
        let area = link.area();
        debug!("{}: {} global links, {:.4} mm^2", self.name(), nodes, area.total);
        self.link = Some(link);
        area
    }

    pub fn refresh(&mut self, conf: Arc<ChipConfig>) -> Result<(), EstimateError> {
        self.model.refresh(&conf, self.kind, self.index)?;
        if let Some(link) = self.link.as_mut() {
            link.model.refresh(&conf, SubsystemKind::Noc, self.index)?;
        }
        self.refresh_conf(conf);
        Ok(())
    }

    fn rebuild_contextual(&mut self) -> Result<(), EstimateError> {
        let coverage = self.conf().noc.unit(self.index).chip_coverage;
        if let Geometry::Contextual { device_area } = self.geometry {
            let length = link_length(device_area, coverage);
            self.model = self.factory.build_bus(self.index, self.conf(), length)?;
        }
        if let Some(device_area) = self.link.as_ref().map(|l| l.device_area) {
            let length = link_length(device_area, coverage);
            let model = self.factory.build_global_link(self.index, self.conf(), length)?;
            if let Some(link) = self.link.as_mut() {
                // keep the footprint finalized at build
                link.model = model;
            }
        }
        Ok(())
    }
}

impl ModuleBehaviors for Instance {
    fn evaluate(&mut self) -> Result<(), EstimateError> {
        let mut peak = self.model.power(EvalMode::Peak);
        let mut runtime = self.model.power(EvalMode::Runtime);
        if let Some(link) = self.link.as_mut() {
            let per_node = ScalingTuple::uniform(link.nodes as f64);
            peak += project(&link.model.power(EvalMode::Peak), &per_node);
            runtime += project(&link.model.power(EvalMode::Runtime), &per_node);
        }
        trace!("{}: peak {:?} runtime {:?}", self.name(), peak, runtime);
        let state = self.state_mut();
        state.peak = peak;
        state.runtime = runtime;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EstimateError> {
        let state = self.state_mut();
        state.peak = PowerRecord::zero();
        state.runtime = PowerRecord::zero();
        if self.geometry != Geometry::Fixed || self.link.is_some() {
            self.rebuild_contextual()?;
        }
        Ok(())
    }
}
