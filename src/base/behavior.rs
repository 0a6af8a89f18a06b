use std::sync::Arc;
use crate::sim::error::EstimateError;

/// Lifecycle shared by everything that contributes to the chip totals.
pub trait ModuleBehaviors {
    /// Recompute this module's power from its current configuration.
    fn evaluate(&mut self) -> Result<(), EstimateError>;

    /// Zero the power accumulators. Area is never touched here.
    fn reset(&mut self) -> Result<(), EstimateError>;
}

pub trait Parameterizable {
    type ConfigType;

    fn conf(&self) -> &Self::ConfigType;

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>);

    /// Swap in a new configuration snapshot. Structure stays as built.
    fn refresh_conf(&mut self, conf: Arc<Self::ConfigType>);
}
