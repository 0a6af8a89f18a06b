use serde::Serialize;

use crate::power::record::PowerRecord;

/// One multiplier per power channel.
///
/// The leakage multiplier covers the whole leakage family (plain, long
/// channel and both power-gated variants).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalingTuple {
    pub dynamic: f64,
    pub leakage: f64,
    pub gate_leakage: f64,
    pub runtime: f64,
}

impl Default for ScalingTuple {
    fn default() -> Self {
        Self::identity()
    }
}

impl ScalingTuple {
    pub const fn new(dynamic: f64, leakage: f64, gate_leakage: f64, runtime: f64) -> Self {
        Self {
            dynamic,
            leakage,
            gate_leakage,
            runtime,
        }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    pub const fn uniform(n: f64) -> Self {
        Self::new(n, n, n, n)
    }

    /// `rate` converts the dynamic channel into watts (a clock rate or an
    /// inverse execution time); every channel is then replicated `n` times.
    pub fn replicated(rate: f64, n: f64) -> Self {
        Self::new(rate * n, n, n, n)
    }
}

/// Scale a raw record channel by channel. Pure.
pub fn project(record: &PowerRecord, tuple: &ScalingTuple) -> PowerRecord {
    PowerRecord {
        dynamic: record.dynamic * tuple.dynamic,
        leakage: record.leakage * tuple.leakage,
        long_channel_leakage: record.long_channel_leakage * tuple.leakage,
        gate_leakage: record.gate_leakage * tuple.gate_leakage,
        power_gated_leakage: record.power_gated_leakage * tuple.leakage,
        power_gated_long_channel_leakage: record.power_gated_long_channel_leakage * tuple.leakage,
        runtime_dynamic: record.runtime_dynamic * tuple.runtime,
    }
}
