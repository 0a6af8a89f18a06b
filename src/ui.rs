use clap::Parser;
use crate::chip::engine::CompositionEngine;
use crate::sim::config::ChipConfig;
use crate::sim::error::EstimateError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(version, about)]
pub struct ChipwattArgs {
    #[arg(help = "Path to chip.toml")]
    pub config_path: PathBuf,
    #[arg(long, help = "Re-evaluate the built chip with each of these configs")]
    pub refresh: Vec<PathBuf>,
    #[arg(long, default_value_t = 1, help = "Print level (0:device, 1:groups, 2:units)")]
    pub plevel: u32,
    #[arg(long, help = "Print the report as JSON")]
    pub json: bool,
    #[arg(long, help = "Print flat power and area columns")]
    pub rows: bool,
    #[arg(long, help = "Run a design-space sweep of this many points")]
    pub sweep: Option<usize>,
    #[arg(long, default_value_t = 0, help = "Sweep seed")]
    pub seed: u64,
    #[arg(long, help = "Override system clock rate (MHz)")]
    pub clock_mhz: Option<f64>,
    #[arg(long, help = "Override number of cores")]
    pub num_cores: Option<usize>,
    #[arg(long, help = "Enable log at level (0:none, 1:info, 2:debug)")]
    pub log: Option<u64>,
}

/// Override TOML options with CLI arguments.
pub fn apply_overrides(conf: &mut ChipConfig, args: &ChipwattArgs) {
    conf.system.clock_rate_mhz = args.clock_mhz.unwrap_or(conf.system.clock_rate_mhz);
    conf.cores.count = args.num_cores.unwrap_or(conf.cores.count);
}

/// Make an engine from the TOML configuration.
/// If `cli_args` is given, override TOML options with CLI arguments.
pub fn make_engine(
    toml_string: &str,
    cli_args: Option<&ChipwattArgs>,
) -> Result<CompositionEngine, EstimateError> {
    let mut conf = ChipConfig::from_toml_str(toml_string)?;
    if let Some(args) = cli_args {
        apply_overrides(&mut conf, args);
    }
    CompositionEngine::build(Arc::new(conf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::behavior::*;
    use crate::chip::kind::SubsystemKind;

    const SAMPLE: &str = include_str!("../configs/manycore.toml");

    #[test]
    fn sample_config_builds_and_evaluates() {
        let mut engine = make_engine(SAMPLE, None).unwrap();
        engine.evaluate().unwrap();
        assert!(engine.area().total > 0.0);
        assert!(engine.power().leakage > 0.0);
        let noc = engine.group(SubsystemKind::Noc).unwrap();
        assert!(noc.instances()[0].link().is_some());
        assert!(engine.report().render(2).unwrap().contains("MC_1:"));
    }

    #[test]
    fn cli_arguments_override_toml() {
        let args = ChipwattArgs::parse_from(["chipwatt", "chip.toml", "--num-cores", "4", "--clock-mhz", "1000"]);
        let engine = make_engine(SAMPLE, Some(&args)).unwrap();
        assert_eq!(4, engine.group(SubsystemKind::Core).unwrap().replication_count());
        assert_eq!(1000.0, engine.conf().system.clock_rate_mhz);
        assert_eq!(1, args.plevel);
    }
}
