//! Per-IP connection limits

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Counts open connections per IP address
///
/// A limit of 0 means unlimited.
#[derive(Debug)]
pub struct ConnectionTracker {
    connections: Arc<Mutex<HashMap<IpAddr, usize>>>,
    max_per_ip: usize,
}

impl ConnectionTracker {
    #[must_use]
    pub fn new(max_per_ip: usize) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            max_per_ip,
        }
    }

    /// Reserve a slot for `ip`, or `None` if it is at its limit
    ///
    /// The slot is released when the returned guard is dropped.
    pub fn try_acquire(&self, ip: IpAddr) -> Option<ConnectionGuard> {
        let mut connections = self.connections.lock().expect("connection tracker lock");
        let count = connections.entry(ip).or_insert(0);

        if self.max_per_ip > 0 && *count >= self.max_per_ip {
            return None;
        }

        *count += 1;
        Some(ConnectionGuard {
            ip,
            connections: self.connections.clone(),
        })
    }

    /// Open connections from `ip`
    pub fn count(&self, ip: IpAddr) -> usize {
        self.connections
            .lock()
            .expect("connection tracker lock")
            .get(&ip)
            .copied()
            .unwrap_or(0)
    }
}

/// Releases its connection slot on drop
#[derive(Debug)]
pub struct ConnectionGuard {
    ip: IpAddr,
    connections: Arc<Mutex<HashMap<IpAddr, usize>>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut connections = self.connections.lock().expect("connection tracker lock");
        if let Some(count) = connections.get_mut(&self.ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(&self.ip);
            }
        }
    }
}
