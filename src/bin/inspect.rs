use catan_client::session::ClientView;
use catan_client::{ClientConfig, GameSnapshot, Viewport, WsMessage};
use clap::Parser;
use serde_json::{json, Value};
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use catan_client::board_view::Placement;

/// Build the client view for a game snapshot and print a JSON summary
#[derive(Parser, Debug)]
#[command(name = "inspect", version)]
struct Args {
    /// Raw game JSON or a websocket frame; stdin when omitted
    path: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Apply the mobile layout scale
    #[arg(long)]
    mobile: bool,

    #[arg(long)]
    hex_size: Option<f64>,

    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let raw = match &args.path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let snapshot = read_snapshot(&raw)?;
    log::info!(
        "Loaded game {} with {} tiles",
        snapshot.id,
        snapshot.board.tiles.len()
    );

    let config = ClientConfig::from_env();
    let viewport = Viewport {
        mobile: args.mobile,
        hex_size_override: args.hex_size,
        ..Viewport::new(args.width, args.height)
    };
    let view = ClientView::build(0, Arc::new(snapshot), &viewport, &config.layout);

    let summary = summarize(&view);
    let out = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{}", out);
    Ok(())
}

fn read_snapshot(raw: &str) -> Result<GameSnapshot, Box<dyn Error>> {
    let value: Value = serde_json::from_str(raw)?;
    if value.get("type").and_then(Value::as_str).is_none() {
        return Ok(serde_json::from_value(value)?);
    }
    match WsMessage::parse(raw)? {
        WsMessage::GameState { game }
        | WsMessage::GameUpdated { game }
        | WsMessage::GameCreated { game, .. } => Ok(*game),
        other => Err(format!("frame carries no game: {:?}", other).into()),
    }
}

fn summarize(view: &ClientView) -> Value {
    let board = &view.board;
    let (exact, fallback): (Vec<_>, Vec<_>) = board
        .edges
        .values()
        .partition(|edge| edge.placement == Placement::Exact);
    let affordances = &view.affordances;

    json!({
        "hex_size": board.hex_size,
        "origin": board.origin,
        "tiles": board.tiles.len(),
        "ports": board.ports.len(),
        "nodes": board.nodes.len(),
        "edges": {
            "exact": exact.len(),
            "fallback": fallback.iter().map(|edge| edge.key.to_string()).collect::<Vec<_>>(),
        },
        "robber": board.robber,
        "turn": view.turn,
        "affordances": {
            "nodes": affordances.nodes.keys().collect::<Vec<_>>(),
            "edges": affordances.edges.keys().map(ToString::to_string).collect::<Vec<_>>(),
            "hexes": affordances
                .hexes
                .iter()
                .map(|(coordinate, entries)| (coordinate.to_string(), json!(entries.len())))
                .collect::<serde_json::Map<String, Value>>(),
            "global": affordances.global.iter().map(|entry| entry.action.tag()).collect::<Vec<_>>(),
            "categories": affordances.categories(),
            "rejected": affordances
                .rejected
                .iter()
                .map(|r| json!({"index": r.index, "error": r.error.to_string()}))
                .collect::<Vec<_>>(),
        },
    })
}
