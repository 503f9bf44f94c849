use anyhow::{Context, Result};
use pendulum_vision::config::PublisherConfig;
use pendulum_vision::interfaces::Publisher;
use pendulum_vision::RelativePosition;
use serde::Serialize;
use std::net::UdpSocket;
use tracing::{debug, warn};

/// One datagram: a point on a named topic. `z` is always zero.
#[derive(Debug, Serialize)]
struct PointMessage<'a> {
    topic: &'a str,
    x: f64,
    y: f64,
    z: f64,
}

/// Fire-and-forget JSON publisher over a connected, non-blocking UDP socket.
pub struct UdpPublisher {
    socket: UdpSocket,
    topic: String,
    failed: u64,
}

impl UdpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind)
            .with_context(|| format!("binding UDP socket on {}", config.bind))?;
        socket
            .connect(&config.address)
            .with_context(|| format!("resolving publisher address {}", config.address))?;
        socket.set_nonblocking(true).context("making UDP socket non-blocking")?;
        Ok(Self {
            socket,
            topic: config.topic.clone(),
            failed: 0,
        })
    }

    /// Datagrams that could not be sent.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    fn encode(&self, position: RelativePosition) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&PointMessage {
            topic: &self.topic,
            x: position.dx,
            y: position.dy,
            z: 0.0,
        })
    }
}

impl Publisher for UdpPublisher {
    fn publish(&mut self, position: RelativePosition) {
        let sent = self
            .encode(position)
            .map_err(std::io::Error::from)
            .and_then(|buf| self.socket.send(&buf));
        match sent {
            Ok(len) => debug!(len, "published relative position"),
            Err(e) => {
                self.failed += 1;
                warn!(error = %e, failed = self.failed, "dropping relative position");
            }
        }
    }
}
