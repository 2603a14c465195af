//! Shared fixtures: several nodes on one in-memory broker.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use hubnet_core::MemberId;
use hubnet_node::bus::InMemoryBroker;
use hubnet_node::chat::ChatStores;
use hubnet_node::config::NodeConfig;
use hubnet_node::party::Member;
use hubnet_node::session::{LocalSessions, SessionEvent};
use hubnet_node::NodeContext;

pub struct TestNode {
    pub ctx: NodeContext,
    pub sessions: Arc<LocalSessions>,
}

impl TestNode {
    /// Connect `m` locally and announce them on the location channel.
    pub async fn connect(&self, m: &Member) -> mpsc::Receiver<SessionEvent> {
        let rx = self.sessions.connect(m.id, &m.name);
        self.ctx.announce_location(m, true).unwrap().wait().await.unwrap();
        rx
    }
}

pub async fn start_node(broker: &Arc<InMemoryBroker>, cfg: NodeConfig, stores: ChatStores) -> TestNode {
    let sessions = Arc::new(LocalSessions::new(cfg.chat.session_queue));
    let ctx = NodeContext::new(cfg, broker.clone(), sessions.clone(), stores).unwrap();
    ctx.start().await.unwrap();
    TestNode { ctx, sessions }
}

pub async fn node(broker: &Arc<InMemoryBroker>, server_id: &str, stores: ChatStores) -> TestNode {
    start_node(broker, NodeConfig::for_server(server_id), stores).await
}

pub fn member(n: u128, name: &str) -> Member {
    Member::new(MemberId(Uuid::from_u128(n)), name)
}

/// Poll `cond` until it holds, failing after two seconds.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let reached = timeout(Duration::from_secs(2), async {
        while !cond() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for: {what}");
}

pub async fn next_event(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no session event within 2s")
        .expect("session queue closed")
}

/// Nothing arrives within a short grace period.
pub async fn assert_quiet(rx: &mut mpsc::Receiver<SessionEvent>) {
    if let Ok(Some(ev)) = timeout(Duration::from_millis(150), rx.recv()).await {
        panic!("unexpected session event: {ev:?}");
    }
}
