pub mod custom;
pub mod parametric;

use crate::chip::kind::SubsystemKind;
use crate::power::{AreaRecord, PowerRecord};
use crate::sim::config::ChipConfig;
use crate::sim::error::EstimateError;

pub use custom::{CustomBlock, DefaultFormula, PowerFormula};
pub use parametric::{ParametricFactory, ParametricModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Peak ("TDP-like") activity.
    Peak,
    /// Activity measured over the workload run.
    Runtime,
}

/// A named part of a leaf, as reported in the per-leaf breakdown.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub area: AreaRecord,
    pub power: PowerRecord,
}

/// One physical/circuit model instance. The engine only sees its figures.
pub trait LeafModel: Send {
    fn area(&self) -> AreaRecord;

    /// Raw, unprojected record for `mode`.
    fn power(&mut self, mode: EvalMode) -> PowerRecord;

    /// Hz.
    fn clock_rate(&self) -> f64;

    /// Seconds of workload the runtime record covers.
    fn execution_time(&self) -> f64;

    fn components(&self, _mode: EvalMode) -> Vec<Component> {
        vec![]
    }

    /// Re-derive operating parameters from `conf` without touching geometry.
    fn refresh(&mut self, conf: &ChipConfig, kind: SubsystemKind, index: usize) -> Result<(), EstimateError>;
}

/// Builds leaf models. Supplied to the engine at construction so callers can
/// plug in their own circuit models.
pub trait ModelFactory: Send + Sync {
    fn build(&self, kind: SubsystemKind, index: usize, conf: &ChipConfig) -> Result<Box<dyn LeafModel>, EstimateError>;

    /// Bus-style interconnect whose wires span `length_mm`.
    fn build_bus(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError>;

    /// Per-router global link of a routed interconnect.
    fn build_global_link(&self, index: usize, conf: &ChipConfig, length_mm: f64) -> Result<Box<dyn LeafModel>, EstimateError>;
}
