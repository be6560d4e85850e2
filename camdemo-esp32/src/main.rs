//! ESP32 camera demo: serves camera frames as PGM, BMP or JPEG over HTTP.

use std::net::TcpListener;

use anyhow::Result;
use camdemo_core::http::start_server;
use camdemo_core::{routes_for, Camera as _};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::{set_target_level, EspLogger};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, LevelFilter};

mod camera;
mod wifi;

use camera::Camera;

#[toml_cfg::toml_config]
pub struct Config {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    wifi_password: &'static str,

    #[default("grayscale")]
    pixel_format: &'static str,
    #[default("qqvga")]
    frame_size: &'static str,
    #[default(12)]
    jpeg_quality: i32,
    #[default(1)]
    fb_count: usize,
    #[default(20_000_000)]
    xclk_freq_hz: i32,

    #[default(-1)]
    pin_pwdn: i32,
    #[default(-1)]
    pin_reset: i32,
    #[default(10)]
    pin_xclk: i32,
    #[default(40)]
    pin_sda: i32,
    #[default(39)]
    pin_scl: i32,
    #[default(48)]
    pin_d7: i32,
    #[default(11)]
    pin_d6: i32,
    #[default(12)]
    pin_d5: i32,
    #[default(14)]
    pin_d4: i32,
    #[default(16)]
    pin_d3: i32,
    #[default(18)]
    pin_d2: i32,
    #[default(17)]
    pin_d1: i32,
    #[default(15)]
    pin_d0: i32,
    #[default(38)]
    pin_vsync: i32,
    #[default(47)]
    pin_href: i32,
    #[default(13)]
    pin_pclk: i32,
}

const HTTP_ADDR: &str = "0.0.0.0:80";

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    // The driver components are chatty at Info
    set_target_level("wifi", LevelFilter::Warn)?;
    set_target_level("gpio", LevelFilter::Warn)?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let camera = Camera::new(&CONFIG).map_err(|e| {
        error!("Camera init failed with error {}", e);
        e
    })?;

    let (wifi, ip) = wifi::connect(
        peripherals.modem,
        sysloop,
        nvs,
        CONFIG.wifi_ssid,
        CONFIG.wifi_password,
    )?;

    let listener = TcpListener::bind(HTTP_ADDR)?;

    let sensor_format = camera.sensor_format();
    let routes = routes_for(sensor_format);
    if routes.is_empty() {
        error!("Sensor format {} has no routes", sensor_format.name());
    }
    for route in routes {
        info!("Open http://{}{} for {}", ip, route.kind.path(), route.description);
    }

    info!("Free heap: {}", unsafe { esp_idf_svc::sys::esp_get_free_heap_size() });
    info!("Camera demo ready");

    let result = start_server(listener, &camera);
    error!("HTTP server stopped (Wi-Fi {:?})", wifi.status().state());
    result?;

    Ok(())
}
