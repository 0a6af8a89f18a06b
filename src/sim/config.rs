use std::str::FromStr;

use log::warn;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::{Table, Value};

use crate::chip::kind::SubsystemKind;
use crate::sim::error::EstimateError;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Result<Self, EstimateError> {
        match section {
            Some(value) => Ok(value.clone().try_into()?),
            None => {
                warn!("config section not found");
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug, FromPrimitive, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    HighPerformance = 0,
    LowStandbyPower = 1,
    LowOperatingPower = 2,
    LpDram = 3,
    CommDram = 4,
}

impl DeviceType {
    pub fn decode(code: u32) -> Result<Self, EstimateError> {
        Self::from_u32(code).ok_or(EstimateError::UnknownEnumerationValue {
            what: "device type",
            value: code,
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DeviceType::HighPerformance => "ITRS high performance device type",
            DeviceType::LowStandbyPower => "ITRS low standby power device type",
            DeviceType::LowOperatingPower => "ITRS low operating power device type",
            DeviceType::LpDram => "LP-DRAM device type",
            DeviceType::CommDram => "COMM-DRAM device type",
        }
    }
}

#[derive(Debug, FromPrimitive, Clone, Copy, PartialEq, Eq)]
pub enum InterconnectProjection {
    Aggressive = 0,
    Conservative = 1,
}

impl InterconnectProjection {
    pub fn decode(code: u32) -> Result<Self, EstimateError> {
        Self::from_u32(code).ok_or(EstimateError::UnknownEnumerationValue {
            what: "interconnect projection type",
            value: code,
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            InterconnectProjection::Aggressive => "aggressive interconnect technology projection",
            InterconnectProjection::Conservative => "conservative interconnect technology projection",
        }
    }
}

#[derive(Debug, FromPrimitive, Clone, Copy, PartialEq, Eq)]
pub enum NocTopology {
    Bus = 0,
    Router = 1,
}

impl NocTopology {
    pub fn decode(code: u32) -> Result<Self, EstimateError> {
        Self::from_u32(code).ok_or(EstimateError::UnknownEnumerationValue {
            what: "interconnect topology",
            value: code,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SystemConfig {
    pub name: String,
    pub tech_node_nm: u32,
    pub temperature_k: u32,
    pub device_type: u32,
    pub interconnect_projection: u32,
    pub clock_rate_mhz: f64,
    pub power_gating: bool,
    pub longer_channel_device: bool,
    pub private_l2: bool,
}

impl Config for SystemConfig {}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "chip".to_string(),
            tech_node_nm: 22,
            temperature_k: 360,
            device_type: 0,
            interconnect_projection: 0,
            clock_rate_mhz: 2000.0,
            power_gating: false,
            longer_channel_device: false,
            private_l2: false,
        }
    }
}

/// A named sub-block inside a unit, reported as its own column.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BlockParams {
    pub name: String,
    pub area_mm2: f64,
    pub energy_per_access_nj: f64,
    pub peak_accesses_per_cycle: f64,
    pub runtime_accesses: f64,
    pub leakage_w: f64,
    pub gate_leakage_w: f64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            area_mm2: 0.0,
            energy_per_access_nj: 0.0,
            peak_accesses_per_cycle: 1.0,
            runtime_accesses: 0.0,
            leakage_w: 0.0,
            gate_leakage_w: 0.0,
        }
    }
}

/// Technology and activity parameters of one configured unit.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UnitParams {
    pub name: Option<String>,
    pub clock_rate_mhz: f64,
    pub execution_time_s: f64,
    pub area_mm2: f64,
    pub aspect_ratio: f64,
    pub energy_per_access_nj: f64,
    pub peak_accesses_per_cycle: f64,
    pub runtime_accesses: f64,
    pub duty_cycle: f64,
    pub fixed_dynamic_w: f64,
    pub leakage_w: f64,
    pub long_channel_ratio: f64,
    pub power_gating_ratio: f64,
    pub gate_leakage_w: f64,
    pub blocks: Vec<BlockParams>,
    // interconnect only
    pub topology: u32,
    pub chip_coverage: f64,
    pub has_global_link: bool,
    pub total_nodes: usize,
    pub link_area_per_mm: f64,
    pub link_energy_per_mm_nj: f64,
    pub link_leakage_per_mm_w: f64,
}

impl Default for UnitParams {
    fn default() -> Self {
        Self {
            name: None,
            clock_rate_mhz: 0.0,
            execution_time_s: 1.0,
            area_mm2: 0.0,
            aspect_ratio: 1.0,
            energy_per_access_nj: 0.0,
            peak_accesses_per_cycle: 1.0,
            runtime_accesses: 0.0,
            duty_cycle: 1.0,
            fixed_dynamic_w: 0.0,
            leakage_w: 0.0,
            long_channel_ratio: 1.0,
            power_gating_ratio: 1.0,
            gate_leakage_w: 0.0,
            blocks: Vec::new(),
            topology: NocTopology::Router as u32,
            chip_coverage: 1.0,
            has_global_link: false,
            total_nodes: 1,
            link_area_per_mm: 0.0,
            link_energy_per_mm_nj: 0.0,
            link_leakage_per_mm_w: 0.0,
        }
    }
}

impl UnitParams {
    /// Clock in Hz; zero inherits the system clock.
    pub fn clock_hz(&self, system: &SystemConfig) -> f64 {
        let mhz = if self.clock_rate_mhz > 0.0 {
            self.clock_rate_mhz
        } else {
            system.clock_rate_mhz
        };
        mhz * 1e6
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GroupConfig {
    pub count: usize,
    pub homogeneous: bool,
    pub channels: usize,
    pub units: Vec<UnitParams>,
}

impl Config for GroupConfig {}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            count: 0,
            homogeneous: true,
            channels: 1,
            units: Vec::new(),
        }
    }
}

impl GroupConfig {
    /// Parameters of unit `index`. Homogeneous groups always read the first
    /// unit; missing entries fall back to defaults.
    pub fn unit(&self, index: usize) -> UnitParams {
        let slot = if self.homogeneous { 0 } else { index };
        self.units.get(slot).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomMode {
    #[default]
    Frequency,
    Interval,
}

impl FromStr for CustomMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "frequency" => Ok(Self::Frequency),
            "interval" => Ok(Self::Interval),
            _ => Err(format!(
                "unsupported custom block mode '{}', expected one of: frequency, interval",
                value
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CustomBlockConfig {
    pub count: usize,
    pub name: String,
    pub area_mm2: f64,
    pub static_power_w: f64,
    pub switching_energy_nj: f64,
    pub mode: CustomMode,
    pub frequency_mhz: f64,
    pub activation_factor: f64,
    pub switch_count: u64,
    pub interval_s: f64,
}

impl Config for CustomBlockConfig {}

impl Default for CustomBlockConfig {
    fn default() -> Self {
        Self {
            count: 0,
            name: "Custom".to_string(),
            area_mm2: 0.0,
            static_power_w: 0.0,
            switching_energy_nj: 0.0,
            mode: CustomMode::Frequency,
            frequency_mhz: 0.0,
            activation_factor: 0.0,
            switch_count: 0,
            interval_s: 1.0,
        }
    }
}

/// The full chip description handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct ChipConfig {
    pub system: SystemConfig,
    pub cores: GroupConfig,
    pub l2: GroupConfig,
    pub l3: GroupConfig,
    pub l1_directory: GroupConfig,
    pub l2_directory: GroupConfig,
    pub memory_controller: GroupConfig,
    pub flash_controller: GroupConfig,
    pub network_interface: GroupConfig,
    pub pcie: GroupConfig,
    pub noc: GroupConfig,
    pub custom_block: CustomBlockConfig,
}

/// Everything about a configuration that fixes the shape of the built tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureKey {
    groups: Vec<(SubsystemKind, usize, bool, usize)>,
    private_l2: bool,
    topologies: Vec<u32>,
    global_links: Vec<Option<usize>>,
    block_counts: Vec<usize>,
    custom_blocks: usize,
}

impl ChipConfig {
    pub fn from_toml_str(toml_string: &str) -> Result<Self, EstimateError> {
        let table: Table = toml::from_str(toml_string)?;
        Ok(ChipConfig {
            system: SystemConfig::from_section(table.get("system"))?,
            cores: GroupConfig::from_section(table.get("cores"))?,
            l2: GroupConfig::from_section(table.get("l2"))?,
            l3: GroupConfig::from_section(table.get("l3"))?,
            l1_directory: GroupConfig::from_section(table.get("l1_directory"))?,
            l2_directory: GroupConfig::from_section(table.get("l2_directory"))?,
            memory_controller: GroupConfig::from_section(table.get("memory_controller"))?,
            flash_controller: GroupConfig::from_section(table.get("flash_controller"))?,
            network_interface: GroupConfig::from_section(table.get("network_interface"))?,
            pcie: GroupConfig::from_section(table.get("pcie"))?,
            noc: GroupConfig::from_section(table.get("noc"))?,
            custom_block: CustomBlockConfig::from_section(table.get("custom_block"))?,
        })
    }

    pub fn group(&self, kind: SubsystemKind) -> &GroupConfig {
        match kind {
            SubsystemKind::Core => &self.cores,
            SubsystemKind::L2 => &self.l2,
            SubsystemKind::L3 => &self.l3,
            SubsystemKind::L1Directory => &self.l1_directory,
            SubsystemKind::L2Directory => &self.l2_directory,
            SubsystemKind::MemoryController => &self.memory_controller,
            SubsystemKind::FlashController => &self.flash_controller,
            SubsystemKind::NetworkInterface => &self.network_interface,
            SubsystemKind::Pcie => &self.pcie,
            SubsystemKind::Noc => &self.noc,
        }
    }

    pub fn group_mut(&mut self, kind: SubsystemKind) -> &mut GroupConfig {
        match kind {
            SubsystemKind::Core => &mut self.cores,
            SubsystemKind::L2 => &mut self.l2,
            SubsystemKind::L3 => &mut self.l3,
            SubsystemKind::L1Directory => &mut self.l1_directory,
            SubsystemKind::L2Directory => &mut self.l2_directory,
            SubsystemKind::MemoryController => &mut self.memory_controller,
            SubsystemKind::FlashController => &mut self.flash_controller,
            SubsystemKind::NetworkInterface => &mut self.network_interface,
            SubsystemKind::Pcie => &mut self.pcie,
            SubsystemKind::Noc => &mut self.noc,
        }
    }

    pub fn device_type(&self) -> Result<DeviceType, EstimateError> {
        DeviceType::decode(self.system.device_type)
    }

    pub fn interconnect_projection(&self) -> Result<InterconnectProjection, EstimateError> {
        InterconnectProjection::decode(self.system.interconnect_projection)
    }

    pub fn structure(&self) -> StructureKey {
        StructureKey {
            groups: SubsystemKind::ALL
                .iter()
                .map(|&kind| {
                    let g = self.group(kind);
                    (kind, g.count, g.homogeneous, g.channels.min(1))
                })
                .collect(),
            private_l2: self.system.private_l2,
            topologies: (0..self.noc.count).map(|i| self.noc.unit(i).topology).collect(),
            // node count of the global-link tree hung off each router
            global_links: (0..self.noc.count)
                .map(|i| {
                    let unit = self.noc.unit(i);
                    let routed = NocTopology::decode(unit.topology).ok() == Some(NocTopology::Router);
                    (routed && unit.has_global_link).then_some(unit.total_nodes)
                })
                .collect(),
            block_counts: SubsystemKind::ALL
                .iter()
                .flat_map(|&kind| {
                    let g = self.group(kind);
                    (0..g.count).map(move |i| g.unit(i).blocks.len())
                })
                .collect(),
            custom_blocks: self.custom_block.count,
        }
    }
}
