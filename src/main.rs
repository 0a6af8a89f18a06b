use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chipwatt::base::behavior::*;
use chipwatt::chip::engine::CompositionEngine;
use chipwatt::chip::sweep::{run_sweep, SweepSpec};
use chipwatt::leaf::EvalMode;
use chipwatt::sim::config::ChipConfig;
use chipwatt::ui::{apply_overrides, make_engine, ChipwattArgs};
use clap::Parser;
use log::{info, LevelFilter};

fn init_logging(level: Option<u64>) {
    match level {
        None => env_logger::init(),
        Some(level) => {
            let filter = match level {
                0 => LevelFilter::Off,
                1 => LevelFilter::Info,
                _ => LevelFilter::Debug,
            };
            env_logger::Builder::from_default_env().filter_level(filter).init();
        }
    }
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))
}

fn print(engine: &CompositionEngine, argv: &ChipwattArgs) -> Result<()> {
    let report = engine.report();
    if argv.json {
        println!("{}", serde_json::to_string_pretty(&report.snapshot())?);
    } else {
        print!("{}", report.render(argv.plevel)?);
    }
    if argv.rows {
        println!("# runtime power (W)");
        for row in report.power_rows(EvalMode::Runtime) {
            println!("{},{}", row.name, row.value);
        }
        println!("# area (mm^2)");
        for row in report.area_rows() {
            println!("{},{}", row.name, row.value);
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let argv = ChipwattArgs::parse();
    init_logging(argv.log);

    let toml_string = read_config(&argv.config_path)?;
    let mut engine = make_engine(&toml_string, Some(&argv))
        .with_context(|| format!("cannot build chip from {}", argv.config_path.display()))?;
    engine.evaluate()?;
    print(&engine, &argv)?;

    for path in &argv.refresh {
        info!("refreshing with {}", path.display());
        let mut conf = ChipConfig::from_toml_str(&read_config(path)?)?;
        apply_overrides(&mut conf, &argv);
        engine
            .evaluate_with(Some(Arc::new(conf)))
            .with_context(|| format!("cannot refresh with {}", path.display()))?;
        print(&engine, &argv)?;
    }

    if let Some(points) = argv.sweep {
        let spec = SweepSpec {
            points,
            seed: argv.seed,
            ..SweepSpec::default()
        };
        let base = engine.conf().clone();
        let results = run_sweep(&mut engine, &base, &spec)?;
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
