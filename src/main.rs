use anyhow::Result;

use ft_esp32_io::board::{Board, BoardLayout};
use ft_esp32_io::pins::PinTable;

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use std::sync::{Arc, Mutex};
    use std::{thread::sleep, time::Duration};

    use anyhow::anyhow;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::http::server::{Configuration as HttpServerConfiguration, EspHttpServer};
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, BlockingWifi, EspWifi};
    use esp_idf_svc::wifi::Configuration as WifiConfiguration;

    use ft_esp32_io::config::CONFIG;
    use ft_esp32_io::esp::EspIo;
    use ft_esp32_io::io::PwmConfig;

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Initializing peripherals");
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // every device is set up before the server can command any of them
    log::info!("Initializing IO objects");
    let io = EspIo::ft_esp32(
        peripherals.ledc,
        peripherals.adc1,
        peripherals.pins,
        PwmConfig::default(),
    )?;
    let board = Board::new(
        io,
        &PinTable::FT_ESP32,
        BoardLayout::default(),
    )?;
    let board = Arc::new(Mutex::new(board));

    log::info!("Starting WiFi access point {}", CONFIG.ap_ssid);
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    wifi.set_configuration(&WifiConfiguration::AccessPoint(AccessPointConfiguration {
        ssid: CONFIG
            .ap_ssid
            .try_into()
            .map_err(|_| anyhow!("SSID too long: {}", CONFIG.ap_ssid))?,
        password: CONFIG
            .ap_pass
            .try_into()
            .map_err(|_| anyhow!("Access point password too long"))?,
        auth_method: AuthMethod::WPA2Personal,
        max_connections: 4,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;
    log::info!(
        "Access point up with IP: {:?}",
        wifi.wifi().ap_netif().get_ip_info()?
    );

    let mut server = EspHttpServer::new(&HttpServerConfiguration::default())?;
    control::build_control_server(&mut server, board)?;

    loop {
        log::info!("Waiting ...");
        sleep(Duration::from_secs(10));
    }
}

#[cfg(target_os = "espidf")]
mod control {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use embedded_svc::http::{Headers, Method};
    use esp_idf_svc::http::server::EspHttpServer;
    use esp_idf_svc::io::{Read, Write};

    use ft_esp32_io::board::Board;
    use ft_esp32_io::command::Command;
    use ft_esp32_io::esp::EspIo;

    const HTML_PAGE: &str = include_str!("../html/index.html");
    const MAX_LEN: usize = 128;

    pub fn build_control_server(
        server: &mut EspHttpServer<'_>,
        board: Arc<Mutex<Board<EspIo>>>,
    ) -> Result<()> {
        server
            .fn_handler("/command", Method::Post, move |mut request| -> Result<()> {
                let len = request.content_len().unwrap_or(0) as usize;

                if len > MAX_LEN {
                    request
                        .into_status_response(413)?
                        .write_all("Request too big".as_bytes())?;
                    return Ok(());
                }

                let mut buf = vec![0; len];
                request.read_exact(&mut buf)?;

                let reply = Command::parse(&buf).and_then(|command| {
                    board
                        .lock()
                        .map_err(|_| anyhow!("Failed to lock board"))?
                        .execute(command)
                });
                match reply {
                    Ok(reply) => {
                        let body = serde_json::to_vec(&reply)?;
                        request
                            .into_response(200, None, &[("Content-Type", "application/json")])?
                            .write_all(&body)?;
                    }
                    Err(err) => {
                        log::warn!("Rejected command: {err:#}");
                        request
                            .into_status_response(400)?
                            .write_all(format!("{err:#}").as_bytes())?;
                    }
                }
                Ok(())
            })?
            .fn_handler("/", Method::Get, move |request| -> Result<()> {
                let mut response = request.into_ok_response()?;
                response.write_all(HTML_PAGE.as_bytes())?;
                Ok(())
            })?;
        Ok(())
    }
}

/// Host build: runs a short command sequence against the in-memory backend.
#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use ft_esp32_io::command::Command;
    use ft_esp32_io::sim::SimulatedIo;

    const DEMO: [&str; 4] = [
        r#"{"device":"motor","index":0,"forward":true,"speed":4}"#,
        r#"{"device":"motor","index":1,"forward":false,"speed":7}"#,
        r#"{"device":"lamp","index":5,"brightness":2}"#,
        r#"{"device":"refresh"}"#,
    ];

    let mut board = Board::new(SimulatedIo::new(), &PinTable::FT_ESP32, BoardLayout::default())?;
    for line in DEMO {
        let reply = board.execute(Command::parse(line.as_bytes())?)?;
        println!("{line} -> {}", serde_json::to_string(&reply)?);
    }
    for channel in 0..8 {
        println!("channel {channel}: duty {:?}", board.io().duty(channel));
    }
    Ok(())
}
