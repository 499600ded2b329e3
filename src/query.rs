//! The public per-server query facade: one socket, Info/Players/Rules/Ping.

#[cfg(not(feature = "async"))]
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};
#[cfg(feature = "async")]
use tokio::net::ToSocketAddrs;

use crate::errors::{Error, Result};
use crate::framer::{self, FrameContext};
use crate::info::{self, ServerInfo, INFO_REQUEST};
use crate::players::{self, PlayerRoster, PLAYER_CHALLENGE_REQUEST};
use crate::rules::{self, RuleSet, RULES_CHALLENGE_REQUEST};
use crate::transport::{Transport, TransportConfig};

/// A query session bound to one game server endpoint. Holds a single
/// connected UDP socket and caches the last-seen [`ServerInfo`], since
/// Players and Rules both need to know whether the server is CS:GO or The
/// Ship before they can decode correctly.
pub struct ServerQuery {
    transport: Transport,
    frame_ctx: FrameContext,
    cached_info: Option<ServerInfo>,
}

#[cfg(not(feature = "async"))]
impl ServerQuery {
    pub fn connect<A: ToSocketAddrs>(addr: A, endpoint: String) -> Result<Self> {
        Self::connect_with_config(addr, endpoint, TransportConfig::default())
    }

    pub fn connect_with_config<A: ToSocketAddrs>(addr: A, endpoint: String, config: TransportConfig) -> Result<Self> {
        let transport = Transport::connect(addr, endpoint, config)?;
        Ok(ServerQuery { transport, frame_ctx: FrameContext::default(), cached_info: None })
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Attempts to reconnect after `close()`, mirroring `sourceserver.py`'s
    /// `retry()`. No-op if the query is not currently closed. Verifies the
    /// connection by re-querying Info; leaves the query closed again on
    /// failure rather than leaving it in a half-reopened state.
    pub fn reopen(&mut self) -> Result<()> {
        if !self.is_closed() {
            return Ok(());
        }
        self.transport.reopen();
        match self.refresh_info() {
            Ok(_) => Ok(()),
            Err(e) => {
                self.transport.close();
                Err(e)
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Always issues a fresh query and updates the cache; see [`Self::info`]
    /// for the cached accessor.
    pub fn refresh_info(&mut self) -> Result<&ServerInfo> {
        self.transport.send(&INFO_REQUEST)?;
        let raw = self.transport.recv()?;
        let payload = framer::frame(&mut self.transport, raw, &self.frame_ctx)?;
        let parsed = info::decode(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))?;
        self.frame_ctx.protocol = Some(parsed.protocol);
        self.frame_ctx.app_id = Some(parsed.app_id);
        self.cached_info = Some(parsed);
        Ok(self.cached_info.as_ref().unwrap())
    }

    /// Returns the cached Info, querying the server the first time.
    pub fn info(&mut self) -> Result<&ServerInfo> {
        if self.cached_info.is_none() {
            self.refresh_info()?;
        }
        Ok(self.cached_info.as_ref().unwrap())
    }

    /// A bare liveness probe: times an Info round trip, discarding the
    /// parsed result.
    pub fn ping(&mut self) -> Result<Duration> {
        let t0 = Instant::now();
        self.refresh_info()?;
        Ok(t0.elapsed())
    }

    pub fn players(&mut self) -> Result<PlayerRoster> {
        let is_csgo = self.info()?.is_csgo();
        let is_the_ship = self.info()?.is_the_ship();

        let challenge = self.do_challenge(&PLAYER_CHALLENGE_REQUEST)?;
        let payload = self.request_framed(&players::build_request(challenge))?;
        players::decode(&payload, is_csgo, is_the_ship).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    /// CS:GO servers reject rules queries outright; short-circuit rather
    /// than spend a round trip discovering that.
    pub fn rules(&mut self) -> Result<RuleSet> {
        if self.info()?.is_csgo() {
            return Ok(RuleSet::default());
        }
        let challenge = self.do_challenge(&RULES_CHALLENGE_REQUEST)?;
        let payload = self.request_framed(&rules::build_request(challenge))?;
        rules::decode(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    /// The challenge reply is framed like any other A2S response (every
    /// response begins with the single-packet header before its command
    /// byte), so it must go through the framer before `decode_challenge`
    /// sees it, the same as the real Players/Rules replies.
    fn do_challenge(&mut self, request: &[u8]) -> Result<[u8; 4]> {
        let payload = self.request_framed(request)?;
        players::decode_challenge(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    fn request_framed(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.transport.send(request)?;
        let raw = self.transport.recv()?;
        framer::frame(&mut self.transport, raw, &self.frame_ctx)
    }
}

#[cfg(feature = "async")]
impl ServerQuery {
    pub async fn connect<A: ToSocketAddrs>(addr: A, endpoint: String) -> Result<Self> {
        Self::connect_with_config(addr, endpoint, TransportConfig::default()).await
    }

    pub async fn connect_with_config<A: ToSocketAddrs>(
        addr: A,
        endpoint: String,
        config: TransportConfig,
    ) -> Result<Self> {
        let transport = Transport::connect(addr, endpoint, config).await?;
        Ok(ServerQuery { transport, frame_ctx: FrameContext::default(), cached_info: None })
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Attempts to reconnect after `close()`, mirroring `sourceserver.py`'s
    /// `retry()`. No-op if the query is not currently closed.
    pub async fn reopen(&mut self) -> Result<()> {
        if !self.is_closed() {
            return Ok(());
        }
        self.transport.reopen();
        match self.refresh_info().await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.transport.close();
                Err(e)
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub async fn refresh_info(&mut self) -> Result<&ServerInfo> {
        self.transport.send(&INFO_REQUEST).await?;
        let raw = self.transport.recv().await?;
        let payload = framer::frame(&mut self.transport, raw, &self.frame_ctx).await?;
        let parsed = info::decode(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))?;
        self.frame_ctx.protocol = Some(parsed.protocol);
        self.frame_ctx.app_id = Some(parsed.app_id);
        self.cached_info = Some(parsed);
        Ok(self.cached_info.as_ref().unwrap())
    }

    pub async fn info(&mut self) -> Result<&ServerInfo> {
        if self.cached_info.is_none() {
            self.refresh_info().await?;
        }
        Ok(self.cached_info.as_ref().unwrap())
    }

    pub async fn ping(&mut self) -> Result<Duration> {
        let t0 = Instant::now();
        self.refresh_info().await?;
        Ok(t0.elapsed())
    }

    pub async fn players(&mut self) -> Result<PlayerRoster> {
        let is_csgo = self.info().await?.is_csgo();
        let is_the_ship = self.info().await?.is_the_ship();

        let challenge = self.do_challenge(&PLAYER_CHALLENGE_REQUEST).await?;
        let payload = self.request_framed(&players::build_request(challenge)).await?;
        players::decode(&payload, is_csgo, is_the_ship).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    pub async fn rules(&mut self) -> Result<RuleSet> {
        if self.info().await?.is_csgo() {
            return Ok(RuleSet::default());
        }
        let challenge = self.do_challenge(&RULES_CHALLENGE_REQUEST).await?;
        let payload = self.request_framed(&rules::build_request(challenge)).await?;
        rules::decode(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    /// See the sync impl's `do_challenge` doc: the challenge reply carries
    /// the same single-packet framing header as any other A2S response.
    async fn do_challenge(&mut self, request: &[u8]) -> Result<[u8; 4]> {
        let payload = self.request_framed(request).await?;
        players::decode_challenge(&payload).map_err(|e| Error::from_decode(self.transport.endpoint(), e))
    }

    async fn request_framed(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.transport.send(request).await?;
        let raw = self.transport.recv().await?;
        framer::frame(&mut self.transport, raw, &self.frame_ctx).await
    }
}
