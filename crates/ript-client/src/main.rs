//! ript-client: command-line RIPT client.
//!
//! Each command joins the gateway, runs its operations on one face, prints
//! whatever the gateway delivered, and leaves.

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::sync::mpsc;

use ript_client::ClientFace;
use ript_core::config::{ClientConfig, RiptConfig};
use ript_core::{
    CallInfo, CloseReason, ContentFilter, ContentInfo, Face, HandlerInfo, Packet, PacketEvent,
};

// ── Output ────────────────────────────────────────────────────────────────────

fn print_event(event: &PacketEvent) {
    println!("═══════════════════════════════════════");
    println!("  {:?} from {}", event.packet.packet_type(), event.sender);
    println!("═══════════════════════════════════════");
    match &event.packet {
        Packet::TrunkGroupDiscovery(info) => {
            if info.trunk_groups.is_empty() {
                println!("  No trunk groups offered.");
            }
            for tg in &info.trunk_groups {
                println!("  ┌─ {}", tg.id);
                println!("  └─ uri : {}", tg.uri);
            }
        }
        Packet::RegisterHandler(info) => {
            println!("  handler       : {}", info.handler_id);
            println!("  advertisement : {}", info.advertisement);
            println!("  uri           : {}", info.uri);
        }
        Packet::Calls(info) => {
            println!("  destination : {}", info.destination);
            println!("  call uri    : {}", info.call_uri);
        }
        Packet::StreamMedia(media) => {
            println!("  seq       : {}", media.seq_no);
            println!("  timestamp : {}", media.timestamp);
            println!("  source    : {}", media.source_id);
            println!("  bytes     : {}", media.media.len());
        }
        Packet::StreamMediaAck(ack) => println!("  seq : {}", ack.seq_no),
        Packet::Content(content) => {
            println!("  id      : {}", content.id);
            println!("  content : {}", String::from_utf8_lossy(&content.content));
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run(config: &ClientConfig, packets: Vec<Packet>) -> Result<()> {
    let face = ClientFace::connect(config)
        .await
        .with_context(|| format!("failed to join gateway at {}", config.gateway_origin))?;
    println!("Joined as {}.", face.name());

    let (intake_tx, mut intake_rx) = mpsc::channel(4);
    face.set_receive_chan(intake_tx)?;

    let mut result = Ok(());
    for packet in packets {
        result = face.send(packet).await;
        if result.is_err() {
            break;
        }
    }
    face.close(CloseReason::Local("command finished".to_string()))
        .await;

    while let Ok(event) = intake_rx.try_recv() {
        print_event(&event);
    }
    match result {
        Err(ript_core::RiptError::CorrelationTimeout) => println!("No content."),
        other => other.context("request failed")?,
    }
    Ok(())
}

fn content(id: &str, text: &str) -> Result<Packet> {
    Ok(Packet::Content(ContentInfo {
        id: id.parse().context("content id must be a number")?,
        filter: ContentFilter::MediaForward,
        content: Bytes::from(text.to_string()),
    }))
}

fn print_usage() {
    println!("Usage: ript-client [options] <command>");
    println!();
    println!("Commands:");
    println!("  join                            Join and leave the gateway");
    println!("  discover                        List trunk groups");
    println!("  register <handler_id> <advert>  Register a handler");
    println!("  call <destination>              Set up a call");
    println!("  push <id> <text>                Push content on the current call");
    println!("  pull                            Pull the next content on the current call");
    println!("  echo <id> <text>                Push content, then pull on the same face");
    println!();
    println!("Every command joins, runs, and leaves. Content pushed by one command is");
    println!("lost when its face leaves, so a later `pull` will not see it; use `echo`.");
    println!();
    println!("Options:");
    println!("  --origin <url>    Gateway origin (default from config)");
    println!("  --trunk <id>      Trunk group id (default from config)");
    println!("  --call <id>       Call id for push/pull (default from config)");
    println!("  --peer <name>     Face name sent to the gateway (default random)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = RiptConfig::load()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            RiptConfig::default()
        })
        .client;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let option = args[i].as_str();
        if matches!(option, "--origin" | "--trunk" | "--call" | "--peer") {
            i += 1;
            let value = args
                .get(i)
                .with_context(|| format!("{} requires a value", option))?
                .clone();
            match option {
                "--origin" => config.gateway_origin = value,
                "--trunk" => config.trunk_group = value,
                "--call" => config.call_id = value,
                _ => config.peer_name = value,
            }
        } else {
            remaining.push(option);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["join"] => run(&config, Vec::new()).await,
        ["discover"] => run(&config, vec![Packet::discovery_query()]).await,
        ["register", handler_id, advertisement] => {
            let packet = Packet::RegisterHandler(HandlerInfo {
                handler_id: handler_id.to_string(),
                advertisement: advertisement.to_string(),
                uri: String::new(),
            });
            run(&config, vec![packet]).await
        }
        ["call", destination] => {
            let packet = Packet::Calls(CallInfo {
                destination: destination.to_string(),
                ..Default::default()
            });
            run(&config, vec![packet]).await
        }
        ["push", id, text] => run(&config, vec![content(id, text)?]).await,
        ["pull"] => run(&config, vec![Packet::pull_request()]).await,
        ["echo", id, text] => {
            run(&config, vec![content(id, text)?, Packet::pull_request()]).await
        }
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
