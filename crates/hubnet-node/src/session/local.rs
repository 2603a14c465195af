use dashmap::DashMap;
use tokio::sync::mpsc;

use hubnet_core::MemberId;

use super::{SessionHandle, SessionProvider};

/// What a local session receives from the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Rendered chat line.
    Chat(String),
    /// Request to move to another server.
    Relocate(String),
}

/// One session's outbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub name: String,
    pub tx: mpsc::Sender<SessionEvent>,
}

/// In-memory session registry:
/// - `member -> Connection`
/// - `lower-case name -> member`
///
/// Delivery is lossy: if a session's queue is full the line is dropped.
pub struct LocalSessions {
    sessions: DashMap<MemberId, Connection>,
    by_name: DashMap<String, MemberId>,
    queue: usize,
}

impl LocalSessions {
    pub fn new(queue: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            by_name: DashMap::new(),
            queue: queue.max(1),
        }
    }

    /// Register a connected player and return the receiving end of its queue.
    /// A reconnect replaces the previous connection.
    pub fn connect(&self, member: MemberId, name: &str) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(self.queue);
        if let Some(old) = self.sessions.insert(
            member,
            Connection {
                name: name.to_string(),
                tx,
            },
        ) {
            self.by_name
                .remove_if(&old.name.to_lowercase(), |_, id| *id == member);
        }
        self.by_name.insert(name.to_lowercase(), member);
        rx
    }

    pub fn disconnect(&self, member: MemberId) -> Option<Connection> {
        let (_, conn) = self.sessions.remove(&member)?;
        self.by_name
            .remove_if(&conn.name.to_lowercase(), |_, id| *id == member);
        Some(conn)
    }

    pub fn find_by_name(&self, name: &str) -> Option<MemberId> {
        self.by_name.get(&name.to_lowercase()).map(|r| *r.value())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn push(&self, member: MemberId, ev: SessionEvent) -> bool {
        let Some(conn) = self.sessions.get(&member).map(|c| c.value().clone()) else {
            return false;
        };
        conn.tx.try_send(ev).is_ok()
    }
}

impl SessionProvider for LocalSessions {
    fn resolve_local(&self, member: MemberId) -> Option<SessionHandle> {
        self.sessions.get(&member).map(|c| SessionHandle {
            member,
            name: c.value().name.clone(),
        })
    }

    fn render_and_deliver(&self, handle: &SessionHandle, rendered: &str) -> bool {
        self.push(handle.member, SessionEvent::Chat(rendered.to_string()))
    }

    fn relocate(&self, handle: &SessionHandle, server: &str) -> bool {
        self.push(handle.member, SessionEvent::Relocate(server.to_string()))
    }

    fn online_members(&self) -> Vec<MemberId> {
        self.sessions.iter().map(|e| *e.key()).collect()
    }
}
