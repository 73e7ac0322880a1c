//! ClientFace: the client-side Face for one remote gateway.
//!
//! Every `send` runs one HTTP exchange against the gateway. Replies to
//! discovery, registration, call setup and media pulls are delivered as
//! [`PacketEvent`]s on the bound intake queue; pushes deliver nothing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use ript_core::config::ClientConfig;
use ript_core::wire::{CONTENT_TYPE_BINARY, CONTENT_TYPE_JSON, PEER_HEADER};
use ript_core::{
    CloseLatch, CloseReason, CloseSignal, ContentFilter, Face, FaceName, IntakeSender, IntakeSlot,
    Packet, PacketEvent, PacketType, RiptError,
};

use crate::http::{exchange, transport, Endpoints};

pub struct ClientFace {
    name: FaceName,
    http: reqwest::Client,
    endpoints: Endpoints,
    trunk_group: String,
    /// Call id used in media URLs; replaced by each call setup reply.
    call_id: Mutex<String>,
    /// Id of the next content expected from the gateway.
    next_content_id: AtomicU32,
    intake: IntakeSlot,
    close: CloseLatch,
}

impl ClientFace {
    /// Join the gateway. No face exists unless the join succeeds.
    pub async fn connect(config: &ClientConfig) -> Result<Self, RiptError> {
        let face = Self::build(config)?;
        exchange(face.http.get(face.endpoints.join())).await?;
        tracing::info!(
            face = %face.name,
            origin = %config.gateway_origin,
            "joined gateway"
        );
        Ok(face)
    }

    fn build(config: &ClientConfig) -> Result<Self, RiptError> {
        let name = match config.peer_name.trim() {
            "" => random_name(),
            configured => FaceName::new(configured),
        };

        let mut headers = HeaderMap::new();
        let peer = HeaderValue::from_str(name.as_str())
            .map_err(|e| RiptError::TransportFailure(format!("invalid peer name: {}", e)))?;
        headers.insert(PEER_HEADER, peer);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(transport)?;

        Ok(Self {
            name,
            http,
            endpoints: Endpoints::new(&config.gateway_origin, &config.base_path),
            trunk_group: config.trunk_group.clone(),
            call_id: Mutex::new(config.call_id.clone()),
            next_content_id: AtomicU32::new(0),
            intake: IntakeSlot::new(),
            close: CloseLatch::new(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn trunk_group(&self) -> &str {
        &self.trunk_group
    }

    pub fn call_id(&self) -> String {
        match self.call_id.lock() {
            Ok(call_id) => call_id.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_call_id(&self, call_id: &str) {
        let mut current = match self.call_id.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = call_id.to_string();
    }

    /// One past the id of the last content pulled. Informational only.
    pub fn next_content_id(&self) -> u32 {
        self.next_content_id.load(Ordering::Relaxed)
    }

    fn bound_intake(&self) -> Result<IntakeSender, RiptError> {
        self.intake.get().ok_or(RiptError::ReceiveChanUnbound)
    }

    async fn deliver(&self, intake: IntakeSender, packet: Packet) -> Result<(), RiptError> {
        let event = PacketEvent::new(self.name.clone(), packet)
            .with_trunk_group(self.trunk_group.clone())
            .with_call(self.call_id());
        intake.send(event).await.map_err(|_| RiptError::IntakeClosed)
    }

    async fn post_json(&self, url: String, packet: &Packet) -> Result<Packet, RiptError> {
        let body = exchange(
            self.http
                .post(url)
                .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
                .body(packet.to_json()?),
        )
        .await?;
        Ok(Packet::from_json(&body)?.expect_type(packet.packet_type())?)
    }

    async fn discover(&self) -> Result<(), RiptError> {
        let intake = self.bound_intake()?;
        let body = exchange(self.http.get(self.endpoints.trunk_groups())).await?;
        let reply = Packet::from_json(&body)?.expect_type(PacketType::TrunkGroupDiscovery)?;
        self.deliver(intake, reply).await
    }

    async fn register(&self, packet: &Packet) -> Result<(), RiptError> {
        let intake = self.bound_intake()?;
        let reply = self
            .post_json(self.endpoints.handlers(&self.trunk_group), packet)
            .await?;
        tracing::debug!(face = %self.name, "handler registration answered");
        self.deliver(intake, reply).await
    }

    async fn place_call(&self, packet: &Packet) -> Result<(), RiptError> {
        let intake = self.bound_intake()?;
        let reply = self
            .post_json(self.endpoints.calls(&self.trunk_group), packet)
            .await?;
        if let Packet::Calls(info) = &reply {
            if let Some(call_id) = info.call_id() {
                tracing::info!(face = %self.name, call = %call_id, "call established");
                self.set_call_id(call_id);
            }
        }
        self.deliver(intake, reply).await
    }

    async fn pull(&self) -> Result<(), RiptError> {
        let intake = self.bound_intake()?;
        let url = self.endpoints.media(&self.trunk_group, &self.call_id());
        let body = exchange(self.http.get(url)).await?;
        let reply = Packet::from_binary(&body)?;
        if let Packet::Content(content) = &reply {
            self.next_content_id
                .store(content.id.wrapping_add(1), Ordering::Relaxed);
        }
        self.deliver(intake, reply).await
    }

    async fn push(&self, packet: &Packet) -> Result<(), RiptError> {
        let url = self.endpoints.media(&self.trunk_group, &self.call_id());
        exchange(
            self.http
                .put(url)
                .header(CONTENT_TYPE, CONTENT_TYPE_BINARY)
                .body(packet.to_binary()?),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Face for ClientFace {
    fn name(&self) -> FaceName {
        self.name.clone()
    }

    async fn send(&self, packet: Packet) -> Result<(), RiptError> {
        self.close.check_open()?;
        match &packet {
            Packet::TrunkGroupDiscovery(_) => self.discover().await,
            Packet::RegisterHandler(_) => self.register(&packet).await,
            Packet::Calls(_) => self.place_call(&packet).await,
            Packet::Content(content) if content.filter == ContentFilter::MediaReverse => {
                self.pull().await
            }
            Packet::Content(_) | Packet::StreamMedia(_) => self.push(&packet).await,
            Packet::StreamMediaAck(_) => Err(RiptError::Unroutable(PacketType::StreamMediaAck)),
        }
    }

    fn set_receive_chan(&self, intake: IntakeSender) -> Result<(), RiptError> {
        self.intake.bind(intake)
    }

    async fn close(&self, reason: CloseReason) {
        if !self.close.fire(reason.clone()) {
            return;
        }
        tracing::info!(face = %self.name, reason = %reason, "leaving gateway");
        if let Err(e) = exchange(self.http.get(self.endpoints.leave())).await {
            tracing::warn!(face = %self.name, error = %e, "leave request failed");
        }
    }

    fn on_close(&self) -> CloseSignal {
        self.close.subscribe()
    }

    fn can_stream(&self) -> bool {
        false
    }
}

fn random_name() -> FaceName {
    FaceName::new(format!("ript-{}", hex::encode(rand::random::<[u8; 8]>())))
}
