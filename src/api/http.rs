// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/api/http.rs
//
// HTTP introspection, the XMRig-style `GET /1/summary` / `GET /api.json`
// pair from the teacher's web_server.rs (axum Router, bind-and-serve),
// narrowed from a dashboard+websocket to a single read-only JSON summary.

use crate::core::hashrate::{LONG_WINDOW, MEDIUM_WINDOW, SHORT_WINDOW};
use crate::dispatcher::Dispatcher;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
struct ApiState {
    dispatcher: Arc<Dispatcher>,
    id: String,
    worker_id: String,
    started: Instant,
}

#[derive(Serialize)]
struct HashrateSummary {
    short: f64,
    medium: f64,
    long: f64,
    highest: f64,
}

#[derive(Serialize)]
struct Summary {
    id: String,
    worker_id: String,
    uptime_seconds: u64,
    hashrate: HashrateSummary,
    hugepages: (usize, usize),
    memory: usize,
}

/// Binds and serves the introspection endpoints until the process exits.
/// Errors binding the port are fatal for the API only, not the miner: a
/// worker pool with no HTTP surface still mines correctly.
pub async fn serve(dispatcher: Arc<Dispatcher>, port: u16) {
    let state = ApiState {
        id: node_id(port),
        worker_id: hostname(),
        started: Instant::now(),
        dispatcher,
    };

    let app = Router::new()
        .route("/1/summary", get(summary_handler))
        .route("/api.json", get(summary_handler))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(port, error = %e, "failed to bind HTTP API");
            return;
        }
    };

    tracing::info!(port, "HTTP API listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "HTTP API server error");
    }
}

async fn summary_handler(State(state): State<ApiState>) -> Json<Summary> {
    let status = state.dispatcher.status();
    let hashrate = state.dispatcher.hashrate();
    Json(Summary {
        id: state.id.clone(),
        worker_id: state.worker_id.clone(),
        uptime_seconds: state.started.elapsed().as_secs(),
        hashrate: HashrateSummary {
            short: hashrate.total(SHORT_WINDOW),
            medium: hashrate.total(MEDIUM_WINDOW),
            long: hashrate.total(LONG_WINDOW),
            highest: hashrate.highest(),
        },
        hugepages: (status.huge_pages_granted, status.huge_pages_requested),
        memory: status.total_ways * status.algorithm.scratchpad_bytes(),
    })
}

/// `keccak256(hostname || port_le || "rxcn-miner-cpu")`, truncated to 16
/// hex chars. A real MAC-address-keyed identifier needs a network
/// interface enumeration crate the teacher doesn't carry; the hostname is
/// a stable-enough per-host seed for the same purpose.
fn node_id(port: u16) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(hostname().as_bytes());
    hasher.update(port.to_le_bytes());
    hasher.update(b"rxcn-miner-cpu");
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    unsafe {
        if libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) == 0 {
            let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            if let Ok(name) = std::str::from_utf8(&buf[..len]) {
                return name.to_string();
            }
        }
    }
    "localhost".to_string()
}
