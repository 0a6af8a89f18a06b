use std::sync::Arc;

use super::common::*;
use crate::base::behavior::*;
use crate::chip::instance::{link_length, Geometry};
use crate::chip::kind::SubsystemKind;
use crate::sim::config::{ChipConfig, NocTopology, UnitParams};

/// 15 mm^2 of cores and L3 ahead of the interconnect.
fn base() -> ChipConfig {
    let mut conf = ChipConfig::default();
    conf.cores = group(2, true, vec![UnitParams { area_mm2: 7.0, ..unit(1.0, 0.0) }]);
    conf.l3 = group(1, true, vec![UnitParams { area_mm2: 1.0, ..UnitParams::default() }]);
    conf
}

fn bus() -> UnitParams {
    UnitParams {
        topology: NocTopology::Bus as u32,
        area_mm2: 1.0,
        chip_coverage: 0.6,
        link_area_per_mm: 0.5,
        link_leakage_per_mm_w: 0.1,
        ..UnitParams::default()
    }
}

fn router(nodes: usize) -> UnitParams {
    UnitParams {
        topology: NocTopology::Router as u32,
        area_mm2: 1.0,
        leakage_w: 0.5,
        has_global_link: true,
        total_nodes: nodes,
        link_area_per_mm: 0.25,
        link_leakage_per_mm_w: 0.1,
        ..UnitParams::default()
    }
}

#[test]
fn link_length_covers_a_square_die() {
    assert_eq!(4.0, link_length(16.0, 1.0));
    assert_eq!(0.0, link_length(-1.0, 1.0));
}

#[test]
fn bus_is_sized_from_everything_built_before_it() {
    let mut conf = base();
    conf.noc = group(1, true, vec![bus()]);
    let (factory, engine) = stub_engine(conf).unwrap();
    // sqrt(15 x 0.6) = 3
    assert_eq!(vec![3.0], *factory.bus_lengths.lock().unwrap());
    let noc = engine.group(SubsystemKind::Noc).unwrap();
    assert_eq!(Geometry::Contextual { device_area: 15.0 }, noc.instances()[0].geometry());
    assert!(close(2.5, noc.aggregate_area().total));
    assert!(close(17.5, engine.area().total));
}

#[test]
fn heterogeneous_buses_see_each_other() {
    let mut conf = base();
    conf.noc = group(2, false, vec![bus(), UnitParams { chip_coverage: 1.0, ..bus() }]);
    let (factory, engine) = stub_engine(conf).unwrap();
    let lengths = factory.bus_lengths.lock().unwrap().clone();
    assert_eq!(3.0, lengths[0]);
    // the second bus sees the first one's 2.5 mm^2 too
    assert!(close(17.5_f64.sqrt(), lengths[1]));
    assert_eq!(2, engine.group(SubsystemKind::Noc).unwrap().instance_count());
}

#[test]
fn reset_rebuilds_bus_but_keeps_its_area() {
    let mut conf = base();
    conf.noc = group(1, true, vec![bus()]);
    let (factory, mut engine) = stub_engine(conf.clone()).unwrap();
    let area = engine.area();
    let builds = factory.builds();

    engine.evaluate().unwrap();
    let leak = engine.power().leakage;
    engine.reset().unwrap();
    assert_eq!(builds + 1, factory.builds());
    assert_eq!(vec![3.0, 3.0], *factory.bus_lengths.lock().unwrap());

    // new wire parameters take effect, the finalized footprint does not move
    let mut next = conf;
    next.noc.units[0].link_area_per_mm = 5.0;
    next.noc.units[0].link_leakage_per_mm_w = 0.2;
    engine.evaluate_with(Some(Arc::new(next))).unwrap();
    assert_eq!(area, engine.area());
    assert!(close(leak + 0.3, engine.power().leakage));
}

#[test]
fn global_links_are_added_per_node() {
    let mut conf = base();
    conf.noc = group(1, true, vec![router(4)]);
    let (factory, mut engine) = stub_engine(conf).unwrap();
    // 15 mm^2 plus the 1 mm^2 router: links span sqrt(16)
    assert_eq!(vec![4.0], *factory.link_lengths.lock().unwrap());
    let noc = engine.group(SubsystemKind::Noc).unwrap();
    let link = noc.instances()[0].link().expect("link attached");
    assert_eq!(4, link.nodes());
    assert!(close(4.0, link.area().total));
    assert!(close(5.0, noc.aggregate_area().total));
    assert!(close(20.0, engine.area().total));

    engine.evaluate().unwrap();
    let noc = engine.group(SubsystemKind::Noc).unwrap();
    // router 0.5 W plus 4 links of 0.4 W
    assert!(close(2.1, noc.aggregate_power().leakage));
}

#[test]
fn homogeneous_links_are_replicated_with_their_router() {
    let mut conf = base();
    conf.noc = group(2, true, vec![router(2)]);
    let (_, mut engine) = stub_engine(conf).unwrap();
    // 15 + 2 routers = 17 mm^2 before the links
    let length = 17.0_f64.sqrt();
    let links = 0.25 * length * 2.0 * 2.0;
    assert!(close(17.0 + links, engine.area().total));
    engine.evaluate().unwrap();
    let before = engine.area();
    engine.reset().unwrap();
    engine.evaluate().unwrap();
    assert_eq!(before, engine.area());
}

#[test]
fn routers_without_global_links_are_fixed() {
    let mut conf = base();
    conf.noc = group(1, true, vec![UnitParams { has_global_link: false, ..router(4) }]);
    let (factory, engine) = stub_engine(conf).unwrap();
    assert!(factory.link_lengths.lock().unwrap().is_empty());
    let noc = engine.group(SubsystemKind::Noc).unwrap();
    assert_eq!(Geometry::Fixed, noc.instances()[0].geometry());
    assert!(noc.instances()[0].link().is_none());
    assert!(close(16.0, engine.area().total));
}
