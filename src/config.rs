//! Build-time settings read from `cfg.toml` (see `cfg.toml.example`).

#[toml_cfg::toml_config]
pub struct Config {
    #[default("FtEsp32")]
    pub ap_ssid: &'static str,
    #[default("fischertechnik")]
    pub ap_pass: &'static str,
    #[default(21700)]
    pub pwm_frequency_hz: u32,
    #[default(8)]
    pub pwm_resolution_bits: u8,
}
