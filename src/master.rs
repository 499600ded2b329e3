//! Steam Master Server client.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::time::Duration;

#[cfg(not(feature = "async"))]
use std::thread;

use crate::cursor::ByteCursor;
use crate::endpoint::ServerEndpoint;
use crate::errors::{Error, Result};
use crate::filter::Filter;
use crate::region::Region;
use crate::transport::{Transport, TransportConfig};

const MASTER_HOST: &str = "hl2master.steampowered.com:27011";
const COMMAND: u8 = 0x31;
const RESPONSE_PREAMBLE: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];
const RECORD_LEN: usize = 6;

/// Defends against the master's rate limiting by capping how many
/// enumeration requests a single [`MasterEnumeration`] will issue.
const QUERY_CAP: u32 = 10;

/// How long to sleep before retrying the very first request if it times
/// out — Valve's master rate-limits aggressively on a cold connection.
const RATE_LIMIT: Duration = Duration::from_secs(300);

fn build_request(region: Region, seed: &ServerEndpoint, filter: &str) -> Vec<u8> {
    let mut req = vec![COMMAND, region.code()];
    req.extend_from_slice(seed.to_string().as_bytes());
    req.push(0);
    req.extend_from_slice(filter.as_bytes());
    req.push(0);
    req
}

fn serialize_filters(filters: &[Filter]) -> Result<String> {
    let mut out = String::new();
    for f in filters {
        out.push_str(&f.serialize()?);
    }
    Ok(out)
}

fn parse_response(endpoint: &str, payload: &[u8]) -> Result<Vec<ServerEndpoint>> {
    if !payload.starts_with(&RESPONSE_PREAMBLE) {
        return Err(Error::InvalidHeader { endpoint: endpoint.to_owned() });
    }
    let records = &payload[RESPONSE_PREAMBLE.len()..];
    if records.len() % RECORD_LEN != 0 {
        return Err(Error::Truncated { endpoint: endpoint.to_owned() });
    }

    let mut out = Vec::with_capacity(records.len() / RECORD_LEN);
    for chunk in records.chunks_exact(RECORD_LEN) {
        let mut cur = ByteCursor::new(chunk);
        let truncated = |_| Error::Truncated { endpoint: endpoint.to_owned() };
        let a = cur.read_u8().map_err(truncated)?;
        let b = cur.read_u8().map_err(truncated)?;
        let c = cur.read_u8().map_err(truncated)?;
        let d = cur.read_u8().map_err(truncated)?;
        let port = cur.read_u16_be().map_err(truncated)?;
        out.push(ServerEndpoint::new_unchecked(Ipv4Addr::new(a, b, c, d), port));
    }
    Ok(out)
}

#[cfg(not(feature = "async"))]
pub struct MasterEnumeration {
    transport: Transport,
    region: Region,
    filter: String,
    seed: ServerEndpoint,
    buffer: VecDeque<ServerEndpoint>,
    requests_sent: u32,
    done: bool,
    first_request: bool,
}

#[cfg(not(feature = "async"))]
impl MasterEnumeration {
    pub fn new(region: Region, filters: &[Filter]) -> Result<Self> {
        Self::with_config(region, filters, TransportConfig::default())
    }

    pub fn with_config(region: Region, filters: &[Filter], config: TransportConfig) -> Result<Self> {
        Self::connect_to(MASTER_HOST, region, filters, config)
    }

    /// Like [`Self::with_config`], but against an arbitrary host instead of
    /// Valve's master. Exists so the enumeration's request/response loop can
    /// be exercised against a local fake server in tests.
    pub fn connect_to(host: &str, region: Region, filters: &[Filter], config: TransportConfig) -> Result<Self> {
        let filter = serialize_filters(filters)?;
        let transport = Transport::connect(host, host.to_owned(), config)?;
        Ok(MasterEnumeration {
            transport,
            region,
            filter,
            seed: ServerEndpoint::parse_seed("0.0.0.0:0")?,
            buffer: VecDeque::new(),
            requests_sent: 0,
            done: false,
            first_request: true,
        })
    }

    fn fetch_batch(&mut self) -> Result<()> {
        let request = build_request(self.region, &self.seed, &self.filter);
        self.transport.send(&request)?;

        let payload = if self.first_request {
            self.recv_first_request()?
        } else {
            self.transport.recv().map_err(|e| match e {
                Error::Timeout { .. } => Error::MasterTimeout,
                other => other,
            })?
        };
        self.first_request = false;
        self.requests_sent += 1;

        let endpoint_str = self.transport.endpoint().to_owned();
        let batch = parse_response(&endpoint_str, &payload)?;

        for ep in &batch {
            if ep.is_sentinel() {
                self.done = true;
                break;
            }
            self.seed = *ep;
            self.buffer.push_back(*ep);
        }

        if self.requests_sent >= QUERY_CAP {
            self.done = true;
        }
        Ok(())
    }

    /// Retries forever, sleeping `RATE_LIMIT` between attempts, as long as
    /// this is the enumeration's very first request.
    fn recv_first_request(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.transport.recv() {
                Ok(payload) => return Ok(payload),
                Err(Error::Timeout { .. }) => {
                    log::debug!("{}: master rate-limited the first request, backing off", self.transport.endpoint());
                    thread::sleep(RATE_LIMIT);
                    self.transport.send(&build_request(self.region, &self.seed, &self.filter))?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(not(feature = "async"))]
impl Iterator for MasterEnumeration {
    type Item = Result<ServerEndpoint>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ep) = self.buffer.pop_front() {
                return Some(Ok(ep));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_batch() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(feature = "async")]
pub struct MasterEnumeration {
    transport: Transport,
    region: Region,
    filter: String,
    seed: ServerEndpoint,
    buffer: VecDeque<ServerEndpoint>,
    requests_sent: u32,
    done: bool,
    first_request: bool,
}

#[cfg(feature = "async")]
impl MasterEnumeration {
    pub async fn new(region: Region, filters: &[Filter]) -> Result<Self> {
        Self::with_config(region, filters, TransportConfig::default()).await
    }

    pub async fn with_config(region: Region, filters: &[Filter], config: TransportConfig) -> Result<Self> {
        Self::connect_to(MASTER_HOST, region, filters, config).await
    }

    pub async fn connect_to(host: &str, region: Region, filters: &[Filter], config: TransportConfig) -> Result<Self> {
        let filter = serialize_filters(filters)?;
        let transport = Transport::connect(host, host.to_owned(), config).await?;
        Ok(MasterEnumeration {
            transport,
            region,
            filter,
            seed: ServerEndpoint::parse_seed("0.0.0.0:0")?,
            buffer: VecDeque::new(),
            requests_sent: 0,
            done: false,
            first_request: true,
        })
    }

    async fn fetch_batch(&mut self) -> Result<()> {
        let request = build_request(self.region, &self.seed, &self.filter);
        self.transport.send(&request).await?;

        let payload = if self.first_request {
            self.recv_first_request().await?
        } else {
            match self.transport.recv().await {
                Err(Error::Timeout { .. }) => return Err(Error::MasterTimeout),
                other => other?,
            }
        };
        self.first_request = false;
        self.requests_sent += 1;

        let endpoint_str = self.transport.endpoint().to_owned();
        let batch = parse_response(&endpoint_str, &payload)?;

        for ep in &batch {
            if ep.is_sentinel() {
                self.done = true;
                break;
            }
            self.seed = *ep;
            self.buffer.push_back(*ep);
        }

        if self.requests_sent >= QUERY_CAP {
            self.done = true;
        }
        Ok(())
    }

    async fn recv_first_request(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.transport.recv().await {
                Ok(payload) => return Ok(payload),
                Err(Error::Timeout { .. }) => {
                    log::debug!("{}: master rate-limited the first request, backing off", self.transport.endpoint());
                    tokio::time::sleep(RATE_LIMIT).await;
                    self.transport.send(&build_request(self.region, &self.seed, &self.filter)).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Manual async iteration. Not a `futures::Stream`: this crate only
    /// pulls in `futures` as a dev-dependency for its own tests, so a
    /// formal `Stream` impl would add a new runtime dependency for no
    /// caller this crate has today.
    pub async fn next(&mut self) -> Option<Result<ServerEndpoint>> {
        loop {
            if let Some(ep) = self.buffer.pop_front() {
                return Some(Ok(ep));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_batch().await {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
