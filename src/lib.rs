//! IO objects for the fischertechnik ESP32 interface: motors and lamps on
//! two A4990 dual motor drivers plus switch/sensor inputs.

pub mod board;
pub mod command;
pub mod config;
pub mod duty;
pub mod enable;
#[cfg(target_os = "espidf")]
pub mod esp;
pub mod input;
pub mod io;
pub mod lamp;
pub mod motor;
pub mod pins;
pub mod sim;
