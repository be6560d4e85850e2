//! Station-mode connection state shared between the Wi-Fi event callbacks
//! and the startup routine.

use std::net::Ipv4Addr;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    /// Radio is being brought up.
    Starting,
    /// Association requested, no address yet.
    Connecting,
    Connected(Ipv4Addr),
    /// Link lost, reconnect requested.
    Disconnected,
}

/// System events the connection logic reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent {
    StaStarted,
    StaDisconnected,
    GotIp(Ipv4Addr),
}

/// What the driver glue must do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetAction {
    Connect,
    None,
}

/// Connection state plus the "connected" signal startup waits on.
#[derive(Debug)]
pub struct NetworkStatus {
    state: Mutex<WifiState>,
    changed: Condvar,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStatus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WifiState::Starting),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WifiState> {
        // The state is a plain value, a poisoned lock still holds a valid one
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> WifiState {
        *self.lock()
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self.state() {
            WifiState::Connected(ip) => Some(ip),
            _ => None,
        }
    }

    /// Apply an event and report which driver call it requires.
    pub fn handle_event(&self, event: NetEvent) -> NetAction {
        let mut state = self.lock();

        let action = match event {
            NetEvent::StaStarted => {
                *state = WifiState::Connecting;
                NetAction::Connect
            }
            NetEvent::StaDisconnected => {
                if matches!(*state, WifiState::Connected(_)) {
                    warn!("Wi-Fi disconnected, reconnecting");
                }
                *state = WifiState::Disconnected;
                NetAction::Connect
            }
            NetEvent::GotIp(ip) => {
                info!("Got IP address {}", ip);
                *state = WifiState::Connected(ip);
                NetAction::None
            }
        };

        self.changed.notify_all();
        action
    }

    /// Block until an address has been obtained or `timeout` elapses.
    pub fn wait_connected_timeout(&self, timeout: Duration) -> Option<Ipv4Addr> {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| !matches!(s, WifiState::Connected(_)))
            .unwrap_or_else(|e| e.into_inner());

        match *state {
            WifiState::Connected(ip) => Some(ip),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_event_sequence() {
        let status = NetworkStatus::new();
        assert_eq!(status.state(), WifiState::Starting);

        assert_eq!(status.handle_event(NetEvent::StaStarted), NetAction::Connect);
        assert_eq!(status.state(), WifiState::Connecting);

        let ip = Ipv4Addr::new(192, 168, 1, 42);
        assert_eq!(status.handle_event(NetEvent::GotIp(ip)), NetAction::None);
        assert_eq!(status.ip(), Some(ip));

        assert_eq!(status.handle_event(NetEvent::StaDisconnected), NetAction::Connect);
        assert_eq!(status.state(), WifiState::Disconnected);
        assert_eq!(status.ip(), None);
    }

    #[test]
    fn test_wait_connected_blocks_until_ip() {
        let status = Arc::new(NetworkStatus::new());
        let ip = Ipv4Addr::new(10, 0, 0, 7);

        let events = status.clone();
        let handle = thread::spawn(move || {
            events.handle_event(NetEvent::StaStarted);
            thread::sleep(Duration::from_millis(20));
            events.handle_event(NetEvent::GotIp(ip));
        });

        assert_eq!(status.wait_connected_timeout(Duration::from_secs(5)), Some(ip));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_without_ip() {
        let status = NetworkStatus::new();
        status.handle_event(NetEvent::StaStarted);
        assert_eq!(status.wait_connected_timeout(Duration::from_millis(10)), None);
    }
}
