pub mod record;
pub mod scaling;

pub use record::{clamp_derived, AreaRecord, PowerRecord};
pub use scaling::{project, ScalingTuple};
