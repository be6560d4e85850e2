//! Station-mode Wi-Fi bring-up.
//!
//! Driver events are translated into [`NetEvent`]s and fed to a shared
//! [`NetworkStatus`]; whenever it asks for a (re)connect the driver is told
//! to connect again, so the link recovers on its own after a drop.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use camdemo_core::network::{NetAction, NetEvent, NetworkStatus};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi, WifiEvent};
use esp_idf_sys::{self as sys, esp};
use log::{info, warn};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(15);

/// Keeps the driver and its event subscriptions alive.
pub struct WifiConnection {
    _wifi: EspWifi<'static>,
    _wifi_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
    status: Arc<NetworkStatus>,
}

impl WifiConnection {
    pub fn status(&self) -> &NetworkStatus {
        &self.status
    }
}

/// Start the station, join `ssid` and block until DHCP hands out an address.
pub fn connect(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    password: &str,
) -> Result<(WifiConnection, Ipv4Addr)> {
    let status = Arc::new(NetworkStatus::new());

    let wifi_status = status.clone();
    let wifi_events = sysloop.subscribe::<WifiEvent, _>(move |event| {
        let event = match event {
            WifiEvent::StaStarted => NetEvent::StaStarted,
            WifiEvent::StaDisconnected { .. } => NetEvent::StaDisconnected,
            _ => return,
        };
        if wifi_status.handle_event(event) == NetAction::Connect {
            if let Err(e) = esp!(unsafe { sys::esp_wifi_connect() }) {
                warn!("esp_wifi_connect failed: {}", e);
            }
        }
    })?;

    let ip_status = status.clone();
    let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| {
        if let IpEvent::DhcpIpAssigned(assignment) = event {
            ip_status.handle_event(NetEvent::GotIp(assignment.ip()));
        }
    })?;

    let mut wifi = EspWifi::new(modem, sysloop, Some(nvs))?;

    // Credentials are compiled in, nothing to persist
    esp!(unsafe { sys::esp_wifi_set_storage(sys::wifi_storage_t_WIFI_STORAGE_RAM) })?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID {:?} is too long", ssid))?,
        password: password
            .try_into()
            .map_err(|_| anyhow!("Wi-Fi password is too long"))?,
        ..Default::default()
    }))?;

    info!("Connecting to \"{}\"", ssid);
    wifi.start()?;

    // Power save adds latency to every streamed frame
    esp!(unsafe { sys::esp_wifi_set_ps(sys::wifi_ps_type_t_WIFI_PS_NONE) })?;

    let ip = loop {
        match status.wait_connected_timeout(PROGRESS_INTERVAL) {
            Some(ip) => break ip,
            None => warn!("Still waiting for \"{}\" ({:?})", ssid, status.state()),
        }
    };
    info!("Connected");

    Ok((
        WifiConnection {
            _wifi: wifi,
            _wifi_events: wifi_events,
            _ip_events: ip_events,
            status,
        },
        ip,
    ))
}
