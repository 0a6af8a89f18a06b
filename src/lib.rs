pub mod base {
    pub mod behavior;
    pub mod module;
}
pub mod chip;
pub mod leaf;
pub mod power;
pub mod sim {
    pub mod config;
    pub mod error;
}
pub mod ui;
