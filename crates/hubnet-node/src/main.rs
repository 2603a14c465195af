//! Standalone hubnet node.
//!
//! Loads `hubnet.yaml` (or the path given as the first argument), runs one
//! node on an in-process broker and stops on Ctrl+C. Real deployments embed
//! `NodeContext` in the server process and pass their own broker driver.

use std::sync::Arc;

use hubnet_core::error::{HubError, Result};
use hubnet_node::bus::InMemoryBroker;
use hubnet_node::chat::ChatStores;
use hubnet_node::session::LocalSessions;
use hubnet_node::{config, telemetry, NodeContext};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hubnet.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let sessions = Arc::new(LocalSessions::new(cfg.chat.session_queue));
    let node = NodeContext::new(
        cfg,
        Arc::new(InMemoryBroker::new()),
        sessions,
        ChatStores::memory(),
    )?;
    node.start().await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| HubError::Internal(format!("signal handler failed: {e}")))?;

    node.shutdown().await
}
