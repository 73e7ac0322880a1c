//! Loopback router: a minimal in-process router for the daemon and tests.
//!
//! Drains the new-face feed and answers control requests itself. Media pushed
//! on a call is relayed to the call's other participants, or echoed to the
//! sender when it is alone.
//!
//! Each adopted face gets its own intake queue, pumped into the router tagged
//! with the adoption it belongs to. A peer that re-joins reuses its face name,
//! so the tag is what keeps a superseded face's late events away from the face
//! that replaced it.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};

use ript_core::config::GatewayConfig;
use ript_core::{
    CloseSignal, ContentFilter, Face, FaceName, Packet, PacketEvent, SharedFace, StreamMediaAck,
    TrunkGroup, TrunkGroupsInfo,
};

use crate::directory::FaceFeed;

/// An event together with the adoption it arrived through.
#[derive(Debug)]
struct Inbound {
    adoption: u64,
    event: PacketEvent,
}

struct Adopted {
    adoption: u64,
    face: SharedFace,
}

pub struct LoopbackRouter {
    base_path: String,
    /// Empty accepts any trunk group.
    trunk_groups: Vec<String>,
    intake_capacity: usize,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    feed: FaceFeed,
    gone_tx: mpsc::UnboundedSender<(u64, FaceName)>,
    gone_rx: mpsc::UnboundedReceiver<(u64, FaceName)>,
    faces: HashMap<FaceName, Adopted>,
    next_adoption: u64,
    /// Call id → faces that set up or pushed media on the call.
    calls: HashMap<String, Vec<FaceName>>,
    next_call: u64,
    shutdown: broadcast::Receiver<()>,
}

impl LoopbackRouter {
    pub fn new(config: &GatewayConfig, feed: FaceFeed, shutdown: broadcast::Receiver<()>) -> Self {
        let intake_capacity = config.intake_capacity.max(1);
        let (inbound_tx, inbound_rx) = mpsc::channel(intake_capacity);
        let (gone_tx, gone_rx) = mpsc::unbounded_channel();
        Self {
            base_path: config.base_path.trim_end_matches('/').to_string(),
            trunk_groups: config.trunk_groups.clone(),
            intake_capacity,
            inbound_tx,
            inbound_rx,
            feed,
            gone_tx,
            gone_rx,
            faces: HashMap::new(),
            next_adoption: 0,
            calls: HashMap::new(),
            next_call: 0,
            shutdown,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("loopback router shutting down");
                    return Ok(());
                }

                face = self.feed.recv() => match face {
                    Some(face) => self.adopt(face),
                    None => {
                        tracing::info!("new-face feed closed, router exiting");
                        return Ok(());
                    }
                },

                Some(inbound) = self.inbound_rx.recv() => self.route(inbound),

                Some((adoption, name)) = self.gone_rx.recv() => self.forget(adoption, &name),
            }
        }
    }

    fn adopt(&mut self, face: SharedFace) {
        let name = face.name();
        let (intake_tx, intake_rx) = mpsc::channel(self.intake_capacity);
        if let Err(e) = face.set_receive_chan(intake_tx) {
            tracing::warn!(face = %name, error = %e, "cannot bind intake, face ignored");
            return;
        }

        self.next_adoption += 1;
        let adoption = self.next_adoption;
        tokio::spawn(pump(
            adoption,
            name.clone(),
            face.on_close(),
            intake_rx,
            self.inbound_tx.clone(),
            self.gone_tx.clone(),
        ));

        if self.faces.insert(name.clone(), Adopted { adoption, face }).is_some() {
            tracing::debug!(face = %name, "router replaced superseded face");
        }
        tracing::info!(face = %name, adoption, faces = self.faces.len(), "router adopted face");
    }

    fn forget(&mut self, adoption: u64, name: &FaceName) {
        // A re-joined peer reuses the name; only drop the entry of the closed adoption.
        if self.faces.get(name).map(|adopted| adopted.adoption) != Some(adoption) {
            return;
        }
        self.faces.remove(name);
        for members in self.calls.values_mut() {
            members.retain(|member| member != name);
        }
        self.calls.retain(|_, members| !members.is_empty());
        tracing::debug!(face = %name, faces = self.faces.len(), "router forgot face");
    }

    fn route(&mut self, inbound: Inbound) {
        let Inbound { adoption, event } = inbound;
        let PacketEvent {
            sender,
            tg_id,
            call_id,
            packet,
        } = event;
        let face = match self.faces.get(&sender) {
            Some(adopted) if adopted.adoption == adoption => adopted.face.clone(),
            Some(_) => {
                tracing::debug!(face = %sender, adoption, "event from superseded face dropped");
                return;
            }
            None => {
                tracing::warn!(face = %sender, "event from unknown face dropped");
                return;
            }
        };

        match packet {
            Packet::TrunkGroupDiscovery(_) => {
                deliver(face, Packet::TrunkGroupDiscovery(self.offer()));
            }

            Packet::RegisterHandler(mut info) => {
                let Some(tg) = self.accept_trunk_group(&sender, tg_id) else {
                    return;
                };
                info.uri = format!(
                    "{}/providertgs/{}/handlers/{}",
                    self.base_path, tg, info.handler_id
                );
                tracing::info!(face = %sender, uri = %info.uri, "handler registered");
                deliver(face, Packet::RegisterHandler(info));
            }

            Packet::Calls(mut info) => {
                let Some(tg) = self.accept_trunk_group(&sender, tg_id) else {
                    return;
                };
                self.next_call += 1;
                let call_id = self.next_call.to_string();
                info.call_uri = format!("{}/providertgs/{}/calls/{}", self.base_path, tg, call_id);
                self.join_call(&call_id, &sender);
                tracing::info!(
                    face = %sender,
                    call = %call_id,
                    destination = %info.destination,
                    "call created"
                );
                deliver(face, Packet::Calls(info));
            }

            Packet::StreamMedia(media) => {
                let Some(call_id) = call_id else {
                    tracing::warn!(face = %sender, "media without call id dropped");
                    return;
                };
                offer_media(
                    &face,
                    Packet::StreamMediaAck(StreamMediaAck {
                        seq_no: media.seq_no,
                    }),
                );
                self.relay(&sender, &face, &call_id, Packet::StreamMedia(media));
            }

            Packet::Content(mut content) => {
                let Some(call_id) = call_id else {
                    tracing::warn!(face = %sender, "content without call id dropped");
                    return;
                };
                content.filter = ContentFilter::MediaReverse;
                self.relay(&sender, &face, &call_id, Packet::Content(content));
            }

            Packet::StreamMediaAck(ack) => {
                tracing::debug!(face = %sender, seq_no = ack.seq_no, "peer ack ignored");
            }
        }
    }

    fn offer(&self) -> TrunkGroupsInfo {
        TrunkGroupsInfo {
            trunk_groups: self
                .trunk_groups
                .iter()
                .map(|id| TrunkGroup {
                    id: id.clone(),
                    uri: format!("{}/providertgs/{}", self.base_path, id),
                })
                .collect(),
        }
    }

    fn accept_trunk_group(&self, sender: &FaceName, tg_id: Option<String>) -> Option<String> {
        match tg_id {
            Some(tg) if self.trunk_groups.is_empty() || self.trunk_groups.contains(&tg) => Some(tg),
            other => {
                tracing::warn!(face = %sender, tg = ?other, "unknown trunk group, no reply");
                None
            }
        }
    }

    fn join_call(&mut self, call_id: &str, member: &FaceName) {
        let members = self.calls.entry(call_id.to_string()).or_default();
        if !members.contains(member) {
            members.push(member.clone());
        }
    }

    fn relay(&mut self, sender: &FaceName, origin: &SharedFace, call_id: &str, packet: Packet) {
        self.join_call(call_id, sender);
        let targets: Vec<&SharedFace> = self
            .calls
            .get(call_id)
            .into_iter()
            .flatten()
            .filter(|member| *member != sender)
            .filter_map(|member| self.faces.get(member).map(|adopted| &adopted.face))
            .collect();

        if targets.is_empty() {
            tracing::trace!(face = %sender, call = %call_id, "no other participant, echoing");
            offer_media(origin, packet);
            return;
        }
        for target in targets {
            offer_media(target, packet.clone());
        }
    }
}

/// Carry one face's events into the router until the face closes.
async fn pump(
    adoption: u64,
    name: FaceName,
    signal: CloseSignal,
    mut intake: mpsc::Receiver<PacketEvent>,
    inbound: mpsc::Sender<Inbound>,
    gone: mpsc::UnboundedSender<(u64, FaceName)>,
) {
    let closed = signal.closed();
    tokio::pin!(closed);
    loop {
        tokio::select! {
            biased;
            _ = &mut closed => break,
            event = intake.recv() => match event {
                Some(event) => {
                    if inbound.send(Inbound { adoption, event }).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
        }
    }
    let _ = gone.send((adoption, name));
}

/// Send a control reply from a separate task so a full mailbox never stalls
/// the router.
fn deliver(face: SharedFace, packet: Packet) {
    tokio::spawn(async move {
        if let Err(e) = face.send(packet).await {
            tracing::debug!(face = %face.name(), error = %e, "reply dropped");
        }
    });
}

/// Queue media without waiting. A face that is not pulling loses the packet.
fn offer_media(face: &SharedFace, packet: Packet) {
    if let Err(e) = face.try_send(packet) {
        tracing::warn!(face = %face.name(), error = %e, "media dropped");
    }
}
