use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

use log::debug;
use num_traits::Zero;
use serde::Serialize;

/// Power figures of one module, in watts once projected.
///
/// Straight out of a leaf model the `dynamic` field is an energy (per cycle
/// for peak evaluation, per run for runtime evaluation); it only becomes a
/// power after [`crate::power::project`] applies the clock or time multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PowerRecord {
    pub dynamic: f64,
    pub leakage: f64,
    pub long_channel_leakage: f64,
    pub gate_leakage: f64,
    pub power_gated_leakage: f64,
    pub power_gated_long_channel_leakage: f64,
    pub runtime_dynamic: f64,
}

impl PowerRecord {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clock-driven plus clock-independent dynamic power.
    pub fn total_dynamic(&self) -> f64 {
        self.dynamic + self.runtime_dynamic
    }

    pub fn subthreshold_leakage(&self, long_channel: bool) -> f64 {
        if long_channel {
            self.long_channel_leakage
        } else {
            self.leakage
        }
    }

    pub fn gated_leakage(&self, long_channel: bool) -> f64 {
        if long_channel {
            self.power_gated_long_channel_leakage
        } else {
            self.power_gated_leakage
        }
    }

    /// Subthreshold (gated or not) plus gate leakage.
    pub fn static_power(&self, power_gating: bool, long_channel: bool) -> f64 {
        let sub = if power_gating {
            self.gated_leakage(long_channel)
        } else {
            self.subthreshold_leakage(long_channel)
        };
        sub + self.gate_leakage
    }

    /// The single figure a report column shows for a module.
    pub fn reported(&self, power_gating: bool, long_channel: bool) -> f64 {
        self.total_dynamic() + self.static_power(power_gating, long_channel)
    }

    pub fn fields(&self) -> [f64; 7] {
        [
            self.dynamic,
            self.leakage,
            self.long_channel_leakage,
            self.gate_leakage,
            self.power_gated_leakage,
            self.power_gated_long_channel_leakage,
            self.runtime_dynamic,
        ]
    }

    pub fn is_non_negative(&self) -> bool {
        self.fields().iter().all(|v| *v >= 0.0)
    }

    /// Elementwise difference, clamped to zero field by field.
    pub fn saturating_sub(&self, other: &PowerRecord) -> PowerRecord {
        PowerRecord {
            dynamic: clamp_derived(self.dynamic - other.dynamic),
            leakage: clamp_derived(self.leakage - other.leakage),
            long_channel_leakage: clamp_derived(self.long_channel_leakage - other.long_channel_leakage),
            gate_leakage: clamp_derived(self.gate_leakage - other.gate_leakage),
            power_gated_leakage: clamp_derived(self.power_gated_leakage - other.power_gated_leakage),
            power_gated_long_channel_leakage: clamp_derived(
                self.power_gated_long_channel_leakage - other.power_gated_long_channel_leakage,
            ),
            runtime_dynamic: clamp_derived(self.runtime_dynamic - other.runtime_dynamic),
        }
    }
}

impl Add for PowerRecord {
    type Output = PowerRecord;

    fn add(mut self, other: PowerRecord) -> PowerRecord {
        self += &other;
        self
    }
}

impl AddAssign<&PowerRecord> for PowerRecord {
    fn add_assign(&mut self, other: &PowerRecord) {
        self.dynamic += other.dynamic;
        self.leakage += other.leakage;
        self.long_channel_leakage += other.long_channel_leakage;
        self.gate_leakage += other.gate_leakage;
        self.power_gated_leakage += other.power_gated_leakage;
        self.power_gated_long_channel_leakage += other.power_gated_long_channel_leakage;
        self.runtime_dynamic += other.runtime_dynamic;
    }
}

impl AddAssign<PowerRecord> for PowerRecord {
    fn add_assign(&mut self, other: PowerRecord) {
        *self += &other;
    }
}

impl Zero for PowerRecord {
    fn zero() -> Self {
        Self::default()
    }

    fn is_zero(&self) -> bool {
        self.fields().iter().all(|v| *v == 0.0)
    }
}

impl Sum for PowerRecord {
    fn sum<I: Iterator<Item = PowerRecord>>(iter: I) -> Self {
        iter.fold(PowerRecord::zero(), |acc, p| acc + p)
    }
}

/// Footprint of a module in mm^2. Width and height describe the bounding
/// box when blocks are abutted side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AreaRecord {
    pub width: f64,
    pub height: f64,
    pub total: f64,
}

impl AreaRecord {
    pub fn new(total: f64, aspect_ratio: f64) -> Self {
        let aspect = if aspect_ratio > 0.0 { aspect_ratio } else { 1.0 };
        let height = (total / aspect).max(0.0).sqrt();
        Self {
            width: height * aspect,
            height,
            total,
        }
    }

    pub fn from_dims(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            total: width * height,
        }
    }
}

impl Add for AreaRecord {
    type Output = AreaRecord;

    fn add(mut self, other: AreaRecord) -> AreaRecord {
        self += other;
        self
    }
}

impl AddAssign for AreaRecord {
    fn add_assign(&mut self, other: AreaRecord) {
        self.width += other.width;
        self.height = self.height.max(other.height);
        self.total += other.total;
    }
}

/// `n` copies in a row.
impl Mul<f64> for AreaRecord {
    type Output = AreaRecord;

    fn mul(self, n: f64) -> AreaRecord {
        AreaRecord {
            width: self.width * n,
            height: self.height,
            total: self.total * n,
        }
    }
}

impl Zero for AreaRecord {
    fn zero() -> Self {
        Self::default()
    }

    fn is_zero(&self) -> bool {
        self.total == 0.0 && self.width == 0.0 && self.height == 0.0
    }
}

impl Sum for AreaRecord {
    fn sum<I: Iterator<Item = AreaRecord>>(iter: I) -> Self {
        iter.fold(AreaRecord::zero(), |acc, a| acc + a)
    }
}

/// Differences used to back a sub-component out of a combined figure can
/// dip below zero through model rounding; those are treated as zero.
pub fn clamp_derived(value: f64) -> f64 {
    if value < 0.0 {
        debug!("clamping negative derived quantity {:e} to zero", value);
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PowerRecord {
        PowerRecord {
            dynamic: 1.0,
            leakage: 2.0,
            long_channel_leakage: 1.5,
            gate_leakage: 0.25,
            power_gated_leakage: 0.5,
            power_gated_long_channel_leakage: 0.4,
            runtime_dynamic: 0.75,
        }
    }

    #[test]
    fn add_is_elementwise() {
        let sum = sample() + sample();
        assert_eq!(2.0, sum.dynamic);
        assert_eq!(4.0, sum.leakage);
        assert_eq!(0.5, sum.gate_leakage);
        assert_eq!(1.5, sum.runtime_dynamic);
    }

    #[test]
    fn reported_picks_leakage_flavour() {
        let p = sample();
        assert_eq!(1.75 + 2.0 + 0.25, p.reported(false, false));
        assert_eq!(1.75 + 1.5 + 0.25, p.reported(false, true));
        assert_eq!(1.75 + 0.5 + 0.25, p.reported(true, false));
        assert_eq!(1.75 + 0.4 + 0.25, p.reported(true, true));
    }

    #[test]
    fn saturating_sub_never_goes_negative() {
        let small = PowerRecord { dynamic: 0.1, ..PowerRecord::default() };
        let diff = small.saturating_sub(&sample());
        assert!(diff.is_non_negative());
        assert_eq!(0.0, diff.dynamic);
    }

    #[test]
    fn clamp_derived_keeps_positive_values() {
        assert_eq!(0.0, clamp_derived(-1e-12));
        assert_eq!(3.0, clamp_derived(3.0));
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        let total: PowerRecord = Vec::<PowerRecord>::new().into_iter().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn area_scaling_and_addition() {
        let a = AreaRecord::from_dims(2.0, 3.0);
        let b = a * 4.0;
        assert_eq!(24.0, b.total);
        assert_eq!(8.0, b.width);
        assert_eq!(3.0, b.height);

        let c = a + AreaRecord::from_dims(1.0, 5.0);
        assert_eq!(11.0, c.total);
        assert_eq!(5.0, c.height);
    }

    #[test]
    fn area_from_aspect_ratio() {
        let a = AreaRecord::new(8.0, 2.0);
        assert!((a.width - 4.0).abs() < 1e-12);
        assert!((a.height - 2.0).abs() < 1e-12);
    }
}
