use std::sync::Arc;

use lootsync_types::{Player, PlayerId, PlayerPatch};
use tokio::sync::RwLock;

/// The signed-in player, shared by everything that needs an identity.
///
/// Created empty at startup, filled by `sign_in`, emptied by `reset`.
#[derive(Clone, Default)]
pub struct SessionStore {
    player: Arc<RwLock<Option<Player>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, player: Player) {
        tracing::info!(player = %player.id, "Signed in");
        *self.player.write().await = Some(player);
    }

    pub async fn reset(&self) {
        if let Some(player) = self.player.write().await.take() {
            tracing::info!(player = %player.id, "Signed out");
        }
    }

    pub async fn player_id(&self) -> Option<PlayerId> {
        self.player.read().await.as_ref().map(|p| p.id.clone())
    }

    pub async fn player(&self) -> Option<Player> {
        self.player.read().await.clone()
    }

    /// Merge a partial payload into the session player, if `player_id` is
    /// the one signed in. Absent fields keep their value.
    pub async fn merge(&self, player_id: &PlayerId, patch: &PlayerPatch) -> Option<Player> {
        let mut guard = self.player.write().await;
        let player = guard.as_mut().filter(|p| &p.id == player_id)?;
        player.apply(patch);
        Some(player.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pid, player};

    #[tokio::test]
    async fn test_merge_only_touches_signed_in_player() {
        let session = SessionStore::new();
        session.sign_in(player("p1", 120, 4)).await;

        let patch: PlayerPatch = serde_json::from_str(r#"{"monstersKilled": 5}"#).unwrap();
        assert!(session.merge(&pid("p2"), &patch).await.is_none());

        let merged = session.merge(&pid("p1"), &patch).await.unwrap();
        assert_eq!(merged.monsters_killed(), 5);
        assert_eq!(merged.coin_balance, 120);
    }

    #[tokio::test]
    async fn test_reset_clears_identity() {
        let session = SessionStore::new();
        session.sign_in(player("p1", 0, 0)).await;
        assert_eq!(session.player_id().await, Some(pid("p1")));

        session.reset().await;
        assert!(session.player_id().await.is_none());
        assert!(session.player().await.is_none());
    }
}
