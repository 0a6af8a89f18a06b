pub mod engine;
pub mod group;
pub mod instance;
pub mod kind;
pub mod report;
pub mod sweep;

mod unit_tests;

pub use engine::CompositionEngine;
pub use group::SubsystemGroup;
pub use instance::{Geometry, Instance};
pub use kind::{KindStrategy, Normalization, SubsystemKind};
pub use report::{ChipReport, Report, ReportRow};
pub use sweep::{run_sweep, SweepPoint, SweepSpec};
