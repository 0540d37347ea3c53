// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use holocron_app::{ConnectivityMonitor, ConnectivitySignal};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use url::Url;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const STOP_POLL: Duration = Duration::from_millis(50);

/// Host and port the probe dials, resolved from the catalog base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    host: String,
    port: u16,
}

impl ProbeTarget {
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).with_context(|| format!("parse probe target {base_url:?}"))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("catalog base_url {base_url:?} has no host"))?
            .to_owned();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("catalog base_url {base_url:?} has no port"))?;
        Ok(Self { host, port })
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One reachability check: resolve, then try each address until one accepts.
/// Resolution failure reads as offline.
pub fn probe_once(target: &ProbeTarget, timeout: Duration) -> ConnectivitySignal {
    let addrs: Vec<SocketAddr> = match (target.host.as_str(), target.port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(error) => {
            tracing::debug!(addr = %target.authority(), %error, "probe resolution failed");
            return ConnectivitySignal::Offline;
        }
    };
    let reachable = addrs
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok());
    if reachable {
        ConnectivitySignal::Online
    } else {
        ConnectivitySignal::Offline
    }
}

/// Background thread reporting catalog reachability to a monitor. Stops
/// when dropped.
pub struct ConnectivityProbe {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectivityProbe {
    pub fn spawn(target: ProbeTarget, interval: Duration, monitor: ConnectivityMonitor) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let timeout = interval.min(MAX_CONNECT_TIMEOUT);
        tracing::info!(addr = %target.authority(), ?interval, "connectivity probe started");

        let handle = thread::spawn(move || {
            while !worker_stop.load(Ordering::Relaxed) {
                let signal = probe_once(&target, timeout);
                if worker_stop.load(Ordering::Relaxed) {
                    break;
                }
                monitor.report(signal);

                let deadline = Instant::now() + interval;
                while Instant::now() < deadline {
                    if worker_stop.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(STOP_POLL.min(interval));
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for ConnectivityProbe {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectivityProbe, ProbeTarget, probe_once};
    use anyhow::Result;
    use holocron_app::{ConnectivityMonitor, ConnectivitySignal};
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    fn local_target(port: u16) -> Result<ProbeTarget> {
        ProbeTarget::from_base_url(&format!("http://127.0.0.1:{port}/api"))
    }

    fn closed_port() -> Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    #[test]
    fn target_uses_scheme_default_port() -> Result<()> {
        let target = ProbeTarget::from_base_url("https://swapi.tech/api")?;
        assert_eq!(target.authority(), "swapi.tech:443");
        let target = ProbeTarget::from_base_url("http://localhost:8080/api")?;
        assert_eq!(target.authority(), "localhost:8080");
        Ok(())
    }

    #[test]
    fn listening_port_probes_online() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let target = local_target(listener.local_addr()?.port())?;
        assert_eq!(
            probe_once(&target, Duration::from_millis(500)),
            ConnectivitySignal::Online
        );
        Ok(())
    }

    #[test]
    fn closed_port_probes_offline() -> Result<()> {
        let target = local_target(closed_port()?)?;
        assert_eq!(
            probe_once(&target, Duration::from_millis(500)),
            ConnectivitySignal::Offline
        );
        Ok(())
    }

    #[test]
    fn probe_thread_reports_to_monitor_and_stops_on_drop() -> Result<()> {
        let monitor = ConnectivityMonitor::new();
        let probe = ConnectivityProbe::spawn(
            local_target(closed_port()?)?,
            Duration::from_millis(20),
            monitor.clone(),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while monitor.is_online() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!monitor.is_online());
        drop(probe);
        Ok(())
    }
}
