//! A non-blocking UDP socket pre-connected to a single remote endpoint, with
//! an adaptive retry schedule on receive.

use std::io;
use std::time::Duration;

#[cfg(not(feature = "async"))]
use std::net::{ToSocketAddrs, UdpSocket};
#[cfg(not(feature = "async"))]
use std::time::Instant;

#[cfg(feature = "async")]
use tokio::net::{ToSocketAddrs, UdpSocket};
#[cfg(feature = "async")]
use tokio::time;

use crate::errors::{Error, Result};

/// Tunable knobs for [`Transport::recv`]'s retry schedule.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    pub max_retries: u8,
    pub base_timeout: Duration,
    pub recv_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            max_retries: 5,
            base_timeout: Duration::from_millis(3000),
            recv_buffer: 4096,
        }
    }
}

pub struct Transport {
    socket: UdpSocket,
    config: TransportConfig,
    endpoint: String,
    closed: bool,
}

impl Transport {
    #[cfg(not(feature = "async"))]
    pub fn connect<A: ToSocketAddrs>(addr: A, endpoint: String, config: TransportConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| Error::Transport { endpoint: endpoint.clone(), source: e })?;
        socket
            .set_nonblocking(true)
            .map_err(|e| Error::Transport { endpoint: endpoint.clone(), source: e })?;
        socket
            .connect(addr)
            .map_err(|e| Error::Transport { endpoint: endpoint.clone(), source: e })?;
        Ok(Transport { socket, config, endpoint, closed: false })
    }

    #[cfg(feature = "async")]
    pub async fn connect<A: ToSocketAddrs>(addr: A, endpoint: String, config: TransportConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::Transport { endpoint: endpoint.clone(), source: e })?;
        socket
            .connect(addr)
            .await
            .map_err(|e| Error::Transport { endpoint: endpoint.clone(), source: e })?;
        Ok(Transport { socket, config, endpoint, closed: false })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Idempotent; marks the transport closed. Subsequent send/recv fail
    /// with `Closed` rather than touching the socket.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Clears the closed flag so `send`/`recv` work again. The underlying
    /// socket was never torn down by `close()`, so there is nothing to
    /// reconnect; this only undoes the guard.
    pub fn reopen(&mut self) {
        self.closed = false;
    }

    #[cfg(not(feature = "async"))]
    pub fn send(&mut self, datagram: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Closed { endpoint: self.endpoint.clone() });
        }
        let sent = self
            .socket
            .send(datagram)
            .map_err(|e| Error::Transport { endpoint: self.endpoint.clone(), source: e })?;
        if sent != datagram.len() {
            return Err(Error::Transport {
                endpoint: self.endpoint.clone(),
                source: io::Error::new(io::ErrorKind::WriteZero, "short UDP send"),
            });
        }
        Ok(())
    }

    #[cfg(feature = "async")]
    pub async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Closed { endpoint: self.endpoint.clone() });
        }
        let sent = self
            .socket
            .send(datagram)
            .await
            .map_err(|e| Error::Transport { endpoint: self.endpoint.clone(), source: e })?;
        if sent != datagram.len() {
            return Err(Error::Transport {
                endpoint: self.endpoint.clone(),
                source: io::Error::new(io::ErrorKind::WriteZero, "short UDP send"),
            });
        }
        Ok(())
    }

    /// Constants: `MAX_RETRIES = 5`, `BASE_TIMEOUT = 3.0s` by default
    /// (overridable via [`TransportConfig`]). Each wake shrinks the deadline
    /// by `BASE_TIMEOUT * (1 - retries / (MAX_RETRIES + 1))`, so the total
    /// schedule is 3.0, 2.5, 2.0, 1.5, 1.0, 0.5s rather than exponential
    /// backoff: a missed reply is treated as a likely drop, not congestion.
    #[cfg(not(feature = "async"))]
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Closed { endpoint: self.endpoint.clone() });
        }
        let mut buf = vec![0u8; self.config.recv_buffer];
        let mut retries: u32 = 0;
        let mut t0 = Instant::now();
        loop {
            match self.socket.recv(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let fraction = 1.0 - (retries as f64) / (self.config.max_retries as f64 + 1.0);
                    let deadline = self.config.base_timeout.mul_f64(fraction);
                    if t0.elapsed() > deadline {
                        if retries >= self.config.max_retries as u32 {
                            return Err(Error::Timeout { endpoint: self.endpoint.clone() });
                        }
                        retries += 1;
                        t0 = Instant::now();
                        log::debug!(
                            "{}: recv timed out, retry {}/{}",
                            self.endpoint,
                            retries,
                            self.config.max_retries
                        );
                    } else {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                }
                Err(e) => return Err(Error::Transport { endpoint: self.endpoint.clone(), source: e }),
            }
        }
    }

    #[cfg(feature = "async")]
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Closed { endpoint: self.endpoint.clone() });
        }
        let mut buf = vec![0u8; self.config.recv_buffer];
        let mut retries: u32 = 0;
        loop {
            let fraction = 1.0 - (retries as f64) / (self.config.max_retries as f64 + 1.0);
            let deadline = self.config.base_timeout.mul_f64(fraction);
            match time::timeout(deadline, self.socket.recv(&mut buf)).await {
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Ok(Err(e)) => return Err(Error::Transport { endpoint: self.endpoint.clone(), source: e }),
                Err(_elapsed) => {
                    if retries >= self.config.max_retries as u32 {
                        return Err(Error::Timeout { endpoint: self.endpoint.clone() });
                    }
                    retries += 1;
                    log::debug!(
                        "{}: recv timed out, retry {}/{}",
                        self.endpoint,
                        retries,
                        self.config.max_retries
                    );
                }
            }
        }
    }
}
