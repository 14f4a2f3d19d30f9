//! Lobby/party/queue state and the event processor that mutates it.
//!
//! `OverlayState` is grounded on spec's data model; `process_event` is an
//! exhaustive match over `Event` grounded on
//! `original_source/src/prism/overlay/process_event.py`, with nickname
//! mutation (`set_nickname`) grounded on `behaviour.py`'s `set_nickname`
//! (settings-then-nick-database lock order, uncache of both the old and new
//! nick so a stale cached entry can't survive a rename).

use std::collections::HashSet;

use tracing::warn;

use crate::event::{Event, PartyRole};
use crate::nick_database::NickDatabase;
use crate::player_cache::PlayerCache;
use crate::settings::Settings;

/// Everything the overlay currently believes about the player's surroundings.
///
/// Invariants: `alive_players` is always a subset of `lobby_players` (nobody
/// can be alive in a lobby they aren't in); `party_members` never contains
/// `own_username` (the player's own row is tracked separately, not as a party
/// member of themselves). `out_of_sync` is set whenever a `LobbyJoin`'s
/// reported headcount disagrees with our own roster size, and is only cleared
/// by the next authoritative `LobbyList` (a `/who` response).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub own_username: Option<String>,
    pub party_members: HashSet<String>,
    pub lobby_players: HashSet<String>,
    pub alive_players: HashSet<String>,
    pub in_queue: bool,
    pub out_of_sync: bool,
}

impl OverlayState {
    pub fn clear_party(&mut self) {
        self.party_members.clear();
    }

    pub fn clear_lobby(&mut self) {
        self.lobby_players.clear();
        self.alive_players.clear();
    }

    pub fn join_queue(&mut self) {
        self.in_queue = true;
    }

    pub fn leave_queue(&mut self) {
        self.in_queue = false;
    }

    pub fn set_lobby(&mut self, usernames: Vec<String>) {
        self.lobby_players = usernames.into_iter().collect();
        self.alive_players = self.lobby_players.clone();
    }

    pub fn add_to_lobby(&mut self, username: String) {
        self.alive_players.insert(username.clone());
        self.lobby_players.insert(username);
    }

    pub fn remove_from_lobby(&mut self, username: &str) {
        self.lobby_players.remove(username);
        self.alive_players.remove(username);
    }

    pub fn mark_dead(&mut self, username: &str) {
        self.alive_players.remove(username);
    }

    pub fn mark_alive(&mut self, username: &str) {
        if self.lobby_players.contains(username) {
            self.alive_players.insert(username.to_string());
        }
    }

    pub fn add_to_party(&mut self, username: String) {
        self.party_members.insert(username);
    }

    pub fn remove_from_party(&mut self, username: &str) {
        self.party_members.remove(username);
    }
}

/// What the caller should do after processing one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// The displayed player list should be recomputed and redrawn.
    pub redraw: bool,
    /// The short-term player cache tier should be cleared (a game just
    /// ended, so this game's pending/unknown markers shouldn't bleed into
    /// the next lobby).
    pub clear_short_term_cache: bool,
}

impl ProcessOutcome {
    fn redraw() -> Self {
        ProcessOutcome {
            redraw: true,
            clear_short_term_cache: false,
        }
    }

    fn quiet() -> Self {
        ProcessOutcome::default()
    }
}

/// Apply `event` to `state`, mutating `settings`/`nick_database`/`player_cache`
/// as a side effect when the event implies a nickname change. Returns what the
/// caller should do next (redraw, and/or drop the short-term cache tier).
pub fn process_event(
    state: &mut OverlayState,
    settings: &mut Settings,
    nick_database: &mut NickDatabase,
    player_cache: &mut PlayerCache,
    event: Event,
) -> ProcessOutcome {
    match event {
        Event::InitializeAs { username } => {
            state.own_username = Some(username);
            state.clear_party();
            state.clear_lobby();
            ProcessOutcome::redraw()
        }

        Event::NewNickname { nick } => {
            let Some(own_username) = state.own_username.clone() else {
                warn!("received NewNickname before own username is known, ignoring");
                return ProcessOutcome::quiet();
            };
            set_nickname(&own_username, Some(&nick), settings, nick_database, player_cache);
            ProcessOutcome::redraw()
        }

        Event::LobbySwap => {
            state.clear_lobby();
            state.leave_queue();
            ProcessOutcome::redraw()
        }

        Event::LobbyJoin { username, count, cap } => {
            // Below the smallest real Bed Wars lobby size; not a join we track.
            if cap < 8 {
                return ProcessOutcome::quiet();
            }
            state.join_queue();
            state.add_to_lobby(username.clone());
            let observed = state.lobby_players.len() as u32;
            if count == observed {
                state.out_of_sync = false;
            } else {
                if count < observed {
                    // Our roster drifted ahead of the server's count (e.g. a
                    // missed leave); trust the server and rebuild around the
                    // player who just triggered this event.
                    state.clear_lobby();
                    state.add_to_lobby(username);
                }
                state.out_of_sync = count != state.lobby_players.len() as u32;
            }
            ProcessOutcome::redraw()
        }

        Event::LobbyLeave { username } => {
            state.remove_from_lobby(&username);
            ProcessOutcome::redraw()
        }

        Event::LobbyList { usernames } => {
            state.out_of_sync = false;
            state.join_queue();
            state.set_lobby(usernames);
            ProcessOutcome::redraw()
        }

        Event::PartyAttach { leader_username } => {
            state.clear_party();
            state.add_to_party(leader_username);
            ProcessOutcome::redraw()
        }

        Event::PartyDetach => {
            state.clear_party();
            ProcessOutcome::redraw()
        }

        Event::PartyJoin { usernames } => {
            for username in usernames {
                state.add_to_party(username);
            }
            ProcessOutcome::redraw()
        }

        Event::PartyLeave { usernames } => {
            let own_left = state
                .own_username
                .as_deref()
                .is_some_and(|own| usernames.iter().any(|u| u == own));
            if own_left {
                state.clear_party();
            } else {
                for username in &usernames {
                    state.remove_from_party(username);
                }
            }
            ProcessOutcome::redraw()
        }

        Event::PartyListIncoming => {
            state.clear_party();
            // More role lines are coming right behind this one; don't redraw
            // on a momentarily-empty party.
            ProcessOutcome::quiet()
        }

        Event::PartyMembershipList { usernames, role: _role } => {
            for username in usernames {
                state.add_to_party(username);
            }
            ProcessOutcome::redraw()
        }

        Event::StartBedwarsGame => {
            state.leave_queue();
            ProcessOutcome::quiet()
        }

        Event::EndBedwarsGame => {
            state.clear_lobby();
            ProcessOutcome {
                redraw: true,
                clear_short_term_cache: true,
            }
        }

        Event::BedwarsGameStartingSoon { .. } => ProcessOutcome::quiet(),

        Event::BedwarsFinalKill { dead_player, .. } => {
            state.mark_dead(&dead_player);
            ProcessOutcome::redraw()
        }

        Event::BedwarsDisconnect { username } => {
            state.mark_dead(&username);
            ProcessOutcome::redraw()
        }

        Event::BedwarsReconnect { username } => {
            state.mark_alive(&username);
            ProcessOutcome::redraw()
        }

        Event::NewAPIKey { key } => {
            settings.hypixel_api_key = Some(key);
            ProcessOutcome::quiet()
        }

        Event::WhisperCommandSetNick { nick, username } => {
            match username {
                Some(username) => {
                    set_nickname(&username, Some(&nick), settings, nick_database, player_cache)
                }
                None => clear_nickname(&nick, settings, nick_database, player_cache),
            }
            ProcessOutcome::redraw()
        }

        Event::ChatMessage { .. } => ProcessOutcome::quiet(),
    }
}

/// Record that `nick` refers to `username`, clearing out whatever the old
/// mapping for either name was. Lock order is settings, then nick database,
/// matching the convention documented for every multi-mutex operation in this
/// crate.
fn set_nickname(
    username: &str,
    nick: Option<&str>,
    settings: &mut Settings,
    nick_database: &mut NickDatabase,
    player_cache: &mut PlayerCache,
) {
    if let Some(old_nick) = settings
        .known_nicks
        .iter()
        .find(|(_, real)| real.as_str() == username)
        .map(|(nick, _)| nick.clone())
    {
        settings.known_nicks.remove(&old_nick);
        nick_database.remove_default(&old_nick);
        player_cache.uncache_player(&old_nick);
    }

    if let Some(nick) = nick {
        settings
            .known_nicks
            .insert(nick.to_string(), username.to_string());
        nick_database.set_default(nick.to_string(), username.to_string());
        player_cache.uncache_player(nick);
    }

    player_cache.uncache_player(username);
}

fn clear_nickname(
    nick: &str,
    settings: &mut Settings,
    nick_database: &mut NickDatabase,
    player_cache: &mut PlayerCache,
) {
    settings.known_nicks.remove(nick);
    nick_database.remove_default(nick);
    player_cache.uncache_player(nick);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn harness() -> (OverlayState, Settings, NickDatabase, PlayerCache) {
        (
            OverlayState::default(),
            Settings::default(),
            NickDatabase::default(),
            PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600)),
        )
    }

    // S1: lobby list followed by a join keeps alive_players a subset of lobby_players.
    #[test]
    fn alive_players_always_subset_of_lobby_players() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string(), "B".to_string()],
            },
        );
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::BedwarsFinalKill {
                dead_player: "A".to_string(),
                raw_message: "A FINAL KILL".to_string(),
            },
        );
        assert!(state.alive_players.is_subset(&state.lobby_players));
        assert!(!state.alive_players.contains("A"));
    }

    // S2: a LobbyJoin reporting a count below our own roster size rebuilds
    // the lobby around the joiner and trusts the server's headcount over our
    // own tracking, staying out_of_sync only if the rebuilt size still
    // disagrees with the reported count.
    #[test]
    fn lobby_join_count_mismatch_sets_out_of_sync() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            },
        );
        let outcome = process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyJoin {
                username: "D".to_string(),
                count: 2,
                cap: 16,
            },
        );
        assert!(state.out_of_sync);
        assert!(outcome.redraw);
        assert_eq!(state.lobby_players, HashSet::from(["D".to_string()]));
    }

    // A LobbyJoin whose reported count matches the roster after rebuilding
    // clears out_of_sync instead of leaving it latched from the mismatch.
    #[test]
    fn lobby_join_rebuild_matching_count_clears_out_of_sync() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            },
        );
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyJoin {
                username: "D".to_string(),
                count: 1,
                cap: 16,
            },
        );
        assert!(!state.out_of_sync);
        assert_eq!(state.lobby_players, HashSet::from(["D".to_string()]));
    }

    // A LobbyJoin whose reported count already matches the observed roster
    // clears any previously latched out_of_sync flag.
    #[test]
    fn lobby_join_matching_count_clears_prior_out_of_sync() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string(), "B".to_string()],
            },
        );
        state.out_of_sync = true;
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyJoin {
                username: "C".to_string(),
                count: 3,
                cap: 16,
            },
        );
        assert!(!state.out_of_sync);
    }

    #[test]
    fn lobby_list_clears_out_of_sync_flag() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        state.out_of_sync = true;
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string()],
            },
        );
        assert!(!state.out_of_sync);
    }

    #[test]
    fn party_leave_of_own_username_clears_whole_party() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        state.own_username = Some("Me".to_string());
        state.party_members = HashSet::from(["Me".to_string(), "Ally".to_string()]);
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::PartyLeave {
                usernames: vec!["Me".to_string()],
            },
        );
        assert!(state.party_members.is_empty());
    }

    #[test]
    fn end_bedwars_game_clears_lobby_and_requests_short_term_cache_clear() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        state.lobby_players = HashSet::from(["A".to_string()]);
        state.alive_players = HashSet::from(["A".to_string()]);
        let outcome = process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::EndBedwarsGame,
        );
        assert!(state.lobby_players.is_empty());
        assert!(outcome.clear_short_term_cache);
    }

    #[test]
    fn new_nickname_before_own_username_known_is_ignored() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        let outcome = process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::NewNickname {
                nick: "Nicky".to_string(),
            },
        );
        assert!(!outcome.redraw);
        assert!(settings.known_nicks.is_empty());
    }

    #[test]
    fn new_nickname_records_mapping_for_own_username() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        state.own_username = Some("Me".to_string());
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::NewNickname {
                nick: "Nicky".to_string(),
            },
        );
        assert_eq!(settings.known_nicks.get("Nicky"), Some(&"Me".to_string()));
        assert_eq!(nick_db.get_default("Nicky"), Some("Me"));
    }

    #[test]
    fn whisper_command_clear_nick_removes_mapping() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        settings
            .known_nicks
            .insert("Nicky".to_string(), "Real".to_string());
        nick_db.set_default("Nicky".to_string(), "Real".to_string());
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::WhisperCommandSetNick {
                nick: "Nicky".to_string(),
                username: None,
            },
        );
        assert!(settings.known_nicks.get("Nicky").is_none());
        assert_eq!(nick_db.get_default("Nicky"), None);
    }

    #[test]
    fn reconnect_only_marks_alive_if_still_in_lobby() {
        let (mut state, mut settings, mut nick_db, mut cache) = harness();
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::LobbyList {
                usernames: vec!["A".to_string()],
            },
        );
        state.mark_dead("A");
        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::BedwarsReconnect {
                username: "Ghost".to_string(),
            },
        );
        assert!(!state.alive_players.contains("Ghost"));

        process_event(
            &mut state,
            &mut settings,
            &mut nick_db,
            &mut cache,
            Event::BedwarsReconnect {
                username: "A".to_string(),
            },
        );
        assert!(state.alive_players.contains("A"));
    }
}
