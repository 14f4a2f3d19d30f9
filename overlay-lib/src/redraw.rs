//! Combines completed stats-fetch results with current lobby state into the
//! sorted player list the output sink displays.
//!
//! Grounded on `original_source/src/prism/overlay/behaviour.py`'s
//! `should_redraw` (drain the completed-stats queue, redraw only if a
//! completed fetch was actually for someone still in the lobby) and
//! `player.py`'s `sort_players`.

use crate::player::{sort_players, Column, Player};
use crate::player_cache::PlayerCache;
use crate::state::OverlayState;
use crate::worker_pool::CompletedWork;

pub struct RedrawAggregator {
    completed_rx: flume::Receiver<CompletedWork>,
}

impl RedrawAggregator {
    pub fn new(completed_rx: flume::Receiver<CompletedWork>) -> Self {
        RedrawAggregator { completed_rx }
    }

    /// Drain every currently-available completed fetch. Returns whether any
    /// of them were relevant to what's currently displayed (a lobby member,
    /// or the user themselves) and therefore worth a redraw.
    pub fn drain_completed(&self, state: &OverlayState) -> bool {
        let mut relevant = false;
        while let Ok(completed) = self.completed_rx.try_recv() {
            let is_lobby_member = state.lobby_players.contains(&completed.username);
            let is_self = state.own_username.as_deref() == Some(completed.username.as_str());
            if is_lobby_member || is_self {
                relevant = true;
            }
        }
        relevant
    }

    /// Build the sorted player list for every current lobby member, pulling
    /// whatever's cached (or a `PendingPlayer` placeholder if a fetch hasn't
    /// landed yet).
    pub fn build_player_list(
        &self,
        state: &OverlayState,
        player_cache: &mut PlayerCache,
        column: Column,
    ) -> Vec<Player> {
        let mut players: Vec<Player> = state
            .lobby_players
            .iter()
            .map(|username| {
                player_cache
                    .get_cached_player(username)
                    .unwrap_or_else(|| Player::PendingPlayer {
                        username: username.clone(),
                    })
            })
            .collect();
        let party: Vec<String> = state.party_members.iter().cloned().collect();
        sort_players(&mut players, &party, column);
        players
    }
}
