//! SSE session lifecycle management.
//!
//! Tracks open event streams keyed by an opaque session id. Each session owns
//! one side of an unbounded channel; the SSE handler drains the other side
//! into the client connection. Queued frames are whole pre-serialized JSON
//! strings, so concurrently completing handlers can never interleave partial
//! frames on one stream.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Sending half of a session's SSE stream.
pub type SessionSender = mpsc::UnboundedSender<String>;

/// Registry of open SSE sessions.
///
/// Explicitly owned (not a global) so independent server instances can
/// coexist; the lock guards only structural mutation of the map.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionSender>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a session id: 16 cryptographically random bytes, base64url,
    /// unpadded.
    pub fn generate_id() -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Register an open session. Returns `false` without overwriting if the
    /// id is already taken.
    pub async fn register(&self, id: &str, sender: SessionSender) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            warn!("Session id collision detected for {id}");
            return false;
        }
        sessions.insert(id.to_string(), sender);
        info!("SSE session started: {id}");
        true
    }

    /// Whether `id` names a currently open session.
    pub async fn is_valid(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of currently open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Best-effort send of one pre-serialized JSON frame.
    ///
    /// A failed send means the peer is gone; the session is cleaned up
    /// immediately. Sends to an unknown (already cleaned up) id are silent
    /// no-ops: there is no longer a channel to report to.
    pub async fn send(&self, id: &str, payload: String) {
        let sender = { self.sessions.read().await.get(id).cloned() };

        match sender {
            Some(tx) => {
                if tx.send(payload).is_err() {
                    warn!("SSE write failed for session {id}, cleaning up");
                    self.cleanup(id).await;
                }
            }
            None => {
                debug!("Dropping frame for unknown session {id}");
            }
        }
    }

    /// Remove a session and dispose its stream. Idempotent.
    pub async fn cleanup(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            info!("Removed SSE session {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_url_safe_and_unpadded() {
        for _ in 0..64 {
            let id = SessionRegistry::generate_id();
            // 16 bytes -> 22 base64 chars, no padding.
            assert_eq!(id.len(), 22);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(SessionRegistry::generate_id()));
        }
    }

    #[tokio::test]
    async fn test_register_and_validity() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(!registry.is_valid("s1").await);
        assert!(registry.register("s1", tx).await);
        assert!(registry.is_valid("s1").await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_collision_is_rejected_not_overwritten() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        assert!(registry.register("dup", tx1).await);
        assert!(!registry.register("dup", tx2).await);

        // The original stream must still be the registered one.
        registry.send("dup", "frame".to_string()).await;
        assert_eq!(rx1.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_send_delivers_whole_frames() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("s1", tx).await;

        registry.send("s1", r#"{"id":1}"#.to_string()).await;
        registry.send("s1", r#"{"id":2}"#.to_string()).await;

        assert_eq!(rx.recv().await.unwrap(), r#"{"id":1}"#);
        assert_eq!(rx.recv().await.unwrap(), r#"{"id":2}"#);
    }

    #[tokio::test]
    async fn test_failed_send_cleans_up_session() {
        let registry = SessionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("s1", tx).await;

        drop(rx); // peer went away
        registry.send("s1", "lost".to_string()).await;

        assert!(!registry.is_valid("s1").await);

        // Subsequent sends to the cleaned-up id are silent no-ops.
        registry.send("s1", "ignored".to_string()).await;
        assert!(!registry.is_valid("s1").await);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("s1", tx).await;

        registry.cleanup("s1").await;
        registry.cleanup("s1").await;
        assert!(registry.is_empty().await);
    }
}
