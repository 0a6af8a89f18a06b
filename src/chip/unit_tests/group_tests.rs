use std::sync::Arc;

use super::common::*;
use crate::base::behavior::*;
use crate::chip::group::SubsystemGroup;
use crate::chip::kind::{strategy_for, BuildContext, SubsystemKind};
use crate::leaf::{EvalMode, ModelFactory};
use crate::sim::config::{ChipConfig, UnitParams};

fn build(conf: ChipConfig, kind: SubsystemKind) -> SubsystemGroup {
    let conf = Arc::new(conf);
    let factory: Arc<dyn ModelFactory> = Arc::new(StubFactory::default());
    let ctx = BuildContext {
        conf: &conf,
        factory: &factory,
        device_area: 0.0,
    };
    SubsystemGroup::build(strategy_for(kind), &ctx)
        .unwrap()
        .expect("group should be present")
}

#[test]
fn homogeneous_group_keeps_one_representative() {
    let mut conf = ChipConfig::default();
    conf.l3 = group(4, true, vec![UnitParams { area_mm2: 2.5, ..unit(0.5, 0.0) }]);
    let g = build(conf, SubsystemKind::L3);
    assert!(g.is_homogeneous());
    assert_eq!(1, g.instance_count());
    assert_eq!(4, g.replication_count());
    assert!(close(10.0, g.aggregate_area().total));
}

#[test]
fn heterogeneous_area_is_summed() {
    let mut conf = ChipConfig::default();
    conf.l2_directory = group(
        2,
        false,
        vec![
            UnitParams { area_mm2: 1.0, ..UnitParams::default() },
            UnitParams { area_mm2: 3.0, ..UnitParams::default() },
        ],
    );
    let g = build(conf, SubsystemKind::L2Directory);
    assert!(!g.is_homogeneous());
    assert_eq!(2, g.instance_count());
    assert!(close(4.0, g.aggregate_area().total));

    let mut seen = vec![];
    g.for_each_instance(|i| seen.push(i.index()));
    assert_eq!(vec![0, 1], seen);
}

#[test]
fn absent_kind_builds_nothing() {
    let conf = Arc::new(ChipConfig::default());
    let factory: Arc<dyn ModelFactory> = Arc::new(StubFactory::default());
    let ctx = BuildContext {
        conf: &conf,
        factory: &factory,
        device_area: 0.0,
    };
    assert!(SubsystemGroup::build(strategy_for(SubsystemKind::L1Directory), &ctx)
        .unwrap()
        .is_none());
}

#[test]
fn group_evaluate_is_a_fresh_fold() {
    let mut conf = ChipConfig::default();
    conf.l3 = group(2, true, vec![unit(0.5, 0.25)]);
    let mut g = build(conf, SubsystemKind::L3);
    g.evaluate().unwrap();
    g.evaluate().unwrap();
    assert!(close(1.0, g.aggregate_power().leakage));
    assert!(close(0.25 * 2000.0 * 2.0, g.aggregate_power().dynamic));
    g.reset().unwrap();
    assert_eq!(0.0, g.aggregate_power().dynamic);
    assert!(close(0.0, g.aggregate_runtime_power().leakage));
}

#[test]
fn per_unit_projection_drops_replication() {
    let mut conf = ChipConfig::default();
    conf.l3 = group(2, true, vec![unit(0.5, 0.25)]);
    let mut g = build(conf, SubsystemKind::L3);
    g.evaluate().unwrap();
    let rep = &g.instances()[0];
    let one = g.per_unit(rep, rep.peak(), EvalMode::Peak);
    assert!(close(0.5, one.leakage));
    assert!(close(500.0, one.dynamic));
}

#[test]
fn duty_cycle_kinds_use_clock_for_runtime() {
    let mut conf = ChipConfig::default();
    conf.pcie = group(1, true, vec![UnitParams { runtime_accesses: 0.5, ..unit(0.0, 1.0) }]);
    let mut g = build(conf, SubsystemKind::Pcie);
    g.evaluate().unwrap();
    assert!(close(2000.0, g.aggregate_power().dynamic));
    assert!(close(1000.0, g.aggregate_runtime_power().dynamic));
}

#[test]
fn absolute_kinds_are_not_rescaled() {
    let mut conf = ChipConfig::default();
    conf.flash_controller = group(3, true, vec![unit(0.0, 0.2)]);
    let mut g = build(conf, SubsystemKind::FlashController);
    g.evaluate().unwrap();
    assert!(close(0.6, g.aggregate_power().dynamic));
}
