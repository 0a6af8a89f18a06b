use std::sync::Arc;

use super::common::close;
use crate::base::behavior::*;
use crate::chip::engine::CompositionEngine;
use crate::chip::report::ReportRow;
use crate::leaf::EvalMode;
use crate::sim::config::ChipConfig;

const CHIP: &str = r#"
    [system]
    name = "report"

    [cores]
    count = 2
    [[cores.units]]
    area_mm2 = 4.0
    leakage_w = 1.0
    [[cores.units.blocks]]
    name = "icache"
    area_mm2 = 1.0
    leakage_w = 0.25
    [[cores.units.blocks]]
    name = "dcache"
    area_mm2 = 1.5
    leakage_w = 0.25

    [l3]
    count = 1
    [[l3.units]]
    area_mm2 = 3.0
    leakage_w = 0.5

    [memory_controller]
    count = 2
    homogeneous = false
    [[memory_controller.units]]
    leakage_w = 0.3
    [[memory_controller.units]]
    leakage_w = 0.7

    [custom_block]
    count = 1
    name = "Accel"
    area_mm2 = 0.5
    static_power_w = 0.1
"#;

fn engine() -> CompositionEngine {
    let conf = ChipConfig::from_toml_str(CHIP).unwrap();
    let mut engine = CompositionEngine::build(Arc::new(conf)).unwrap();
    engine.evaluate().unwrap();
    engine
}

fn names(rows: &[ReportRow]) -> Vec<&str> {
    rows.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn power_rows_are_core_major_then_groups() {
    let engine = engine();
    let rows = engine.report().power_rows(EvalMode::Runtime);
    assert_eq!(
        vec!["C0_IC", "C0_DC", "C0_Other", "C1_IC", "C1_DC", "C1_Other", "L3", "MC", "Accel"],
        names(&rows)
    );
    assert!(close(0.25, rows[0].value));
    assert!(close(1.0, rows[2].value));
    assert!(close(0.5, rows[6].value));
    assert!(close(1.0, rows[7].value));
    assert!(close(0.1, rows[8].value));
}

#[test]
fn area_rows_match_power_rows() {
    let engine = engine();
    let report = engine.report();
    let area = report.area_rows();
    assert_eq!(names(&report.power_rows(EvalMode::Peak)), names(&area));
    assert!(close(1.0, area[0].value));
    assert!(close(1.5, area[1].value));
    assert!(close(4.0, area[2].value));
    assert!(close(3.0, area[6].value));
    assert!(close(0.5, area[8].value));
}

#[test]
fn rows_are_stable_across_rounds() {
    let mut engine = engine();
    let first = engine.report().power_rows(EvalMode::Runtime);
    engine.evaluate().unwrap();
    engine.reset().unwrap();
    engine.evaluate().unwrap();
    assert_eq!(first, engine.report().power_rows(EvalMode::Runtime));
}

#[test]
fn leaves_expand_every_unit() {
    let engine = engine();
    let leaves = engine.report().leaves();
    let names: Vec<&str> = leaves.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(vec!["C0", "C1", "L3_0", "MC_0", "MC_1"], names);
    assert!(close(1.5, leaves[0].power.total_leakage));
    assert!(close(6.5, leaves[1].area_mm2));
    assert!(close(0.7, leaves[4].power.subthreshold_leakage));
}

#[test]
fn device_and_group_summaries() {
    let engine = engine();
    let report = engine.report();
    let device = report.device();
    assert!(close(13.0 + 3.0 + 0.5, device.area_mm2));
    assert!(close(3.0 + 0.5 + 1.0 + 0.1, device.power.total_leakage));
    assert_eq!(1, device.rounds);

    let groups = report.groups();
    assert_eq!(3, groups.len());
    assert_eq!("Cores", groups[0].label);
    assert_eq!(2, groups[0].replication);
    assert!(!groups[2].homogeneous);
}

#[test]
fn render_respects_print_level() {
    let engine = engine();
    let report = engine.report();
    let terse = report.render(0).unwrap();
    assert!(terse.contains("Device type: ITRS high performance device type"));
    assert!(terse.contains("Processor:"));
    assert!(!terse.contains("Total Cores"));

    let groups = report.render(1).unwrap();
    assert!(groups.contains("Total Cores: 2 unit(s)"));
    assert!(groups.contains("Accel:"));
    assert!(!groups.contains("MC_1:"));

    let full = report.render(2).unwrap();
    assert!(full.contains("MC_1:"));
}

#[test]
fn snapshot_serializes() {
    let engine = engine();
    let value = serde_json::to_value(engine.report().snapshot()).unwrap();
    assert_eq!("report", value["device"]["name"]);
    assert_eq!("core", value["groups"][0]["kind"]);
    assert_eq!(5, value["leaves"].as_array().unwrap().len());
}
