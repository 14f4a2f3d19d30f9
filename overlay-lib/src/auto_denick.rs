//! Heuristic correlation of a missing party teammate with the single unknown
//! nick in the lobby, so a nicked friend shows up denicked without the user
//! having to type a `/w !nick=` command themselves.
//!
//! Grounded on `original_source/src/prism/overlay/behaviour.py`'s
//! `autodenick_teammate`: only fires with exactly one missing teammate and
//! exactly one unresolved nick, only for lobby sizes that are real Bed Wars
//! modes, and only once every lobby member's long-term cache entry has
//! settled (no pending/missing lookups left to wait on).

use crate::nick_database::NickDatabase;
use crate::player::Player;
use crate::player_cache::PlayerCache;
use crate::settings::Settings;
use crate::state::OverlayState;

/// Bed Wars lobby sizes the heuristic trusts. Anything else (4-player
/// practice lobbies, non-Bedwars game modes that share this client) is
/// skipped rather than guessed at.
const VALID_LOBBY_SIZES: [usize; 3] = [8, 12, 16];

/// Attempt to denick the single ambiguous lobby member as the single missing
/// party teammate. Returns `true` if a nick mapping was recorded (the caller
/// should then redraw).
pub fn autodenick_teammate(
    state: &OverlayState,
    player_cache: &mut PlayerCache,
    nick_database: &mut NickDatabase,
    settings: &mut Settings,
) -> bool {
    if !state.in_queue || state.out_of_sync {
        return false;
    }

    let mut missing_teammates: Vec<&String> = state
        .party_members
        .iter()
        .filter(|member| !state.lobby_players.contains(member.as_str()))
        .collect();
    if missing_teammates.is_empty() {
        return false;
    }

    if !VALID_LOBBY_SIZES.contains(&state.lobby_players.len()) {
        return false;
    }
    if state.lobby_players != state.alive_players {
        return false;
    }

    let mut unknown_nick: Option<String> = None;

    for lobby_member in &state.lobby_players {
        let Some(player) = player_cache.get_long_term_cached_player(lobby_member) else {
            // Still waiting on this player's fetch to settle.
            return false;
        };
        if matches!(player, Player::PendingPlayer { .. }) {
            return false;
        }

        match player {
            Player::KnownPlayer { nick: None, .. } => {
                // A plainly-known player, not a nick candidate.
            }
            Player::KnownPlayer {
                username, nick: Some(nick), ..
            } => {
                // Already denicked. If the nick database agrees this nick
                // belongs to one of our missing teammates, that teammate is
                // already accounted for.
                if let Some(mapped_username) = nick_database.get_default(&nick) {
                    if mapped_username == username {
                        missing_teammates.retain(|m| m.as_str() != username);
                    }
                }
            }
            Player::NickedPlayer { nick } => {
                if unknown_nick.is_some() {
                    // More than one unresolved nick in the lobby; ambiguous.
                    return false;
                }
                unknown_nick = Some(nick);
            }
            Player::UnknownPlayer { .. } => {}
            Player::PendingPlayer { .. } => unreachable!("handled above"),
        }
    }

    if missing_teammates.len() != 1 {
        return false;
    }
    let Some(unknown_nick) = unknown_nick else {
        return false;
    };
    let missing_teammate = missing_teammates[0].clone();

    settings
        .known_nicks
        .insert(unknown_nick.clone(), missing_teammate.clone());
    nick_database.set_default(unknown_nick.clone(), missing_teammate);
    player_cache.uncache_player(&unknown_nick);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Stats;
    use std::collections::HashSet;
    use std::time::Duration;

    fn stats() -> Stats {
        Stats::new(100.0, 10, 5, 4, 2, 2, 1, 3, 10, Some(1))
    }

    fn lobby_of(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Player{i}")).collect()
    }

    // S4: one missing teammate + one unresolved nick in an otherwise fully
    // cached, exactly-matched lobby resolves unambiguously.
    #[test]
    fn resolves_single_missing_teammate_against_single_unknown_nick() {
        let mut state = OverlayState::default();
        state.in_queue = true;
        state.party_members = HashSet::from(["Friend".to_string()]);
        let members = lobby_of(7);
        state.lobby_players = members.iter().cloned().chain(["SneakyNick".to_string()]).collect();
        state.alive_players = state.lobby_players.clone();

        let mut cache = PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600));
        let mut nick_db = NickDatabase::default();
        let mut settings = Settings::default();
        let genus = cache.genus();
        for member in &members {
            cache.set_cached_player(
                member,
                Player::KnownPlayer {
                    username: member.clone(),
                    uuid: format!("uuid-{member}"),
                    stars: 100.0,
                    stats: stats(),
                    nick: None,
                    tags: None,
                },
                genus,
            );
        }
        cache.set_cached_player(
            "SneakyNick",
            Player::NickedPlayer {
                nick: "SneakyNick".to_string(),
            },
            genus,
        );

        let resolved = autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings);
        assert!(resolved);
        assert_eq!(nick_db.get_default("SneakyNick"), Some("Friend"));
    }

    #[test]
    fn does_nothing_when_not_in_queue() {
        let state = OverlayState::default();
        let mut cache = PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600));
        let mut nick_db = NickDatabase::default();
        let mut settings = Settings::default();
        assert!(!autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings));
    }

    #[test]
    fn does_nothing_with_no_missing_teammates() {
        let mut state = OverlayState::default();
        state.in_queue = true;
        state.party_members = HashSet::from(["Friend".to_string()]);
        state.lobby_players = HashSet::from(["Friend".to_string()]);
        state.alive_players = state.lobby_players.clone();
        let mut cache = PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600));
        let mut nick_db = NickDatabase::default();
        let mut settings = Settings::default();
        assert!(!autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings));
    }

    #[test]
    fn does_nothing_for_non_standard_lobby_size() {
        let mut state = OverlayState::default();
        state.in_queue = true;
        state.party_members = HashSet::from(["Friend".to_string()]);
        state.lobby_players = HashSet::from(["A".to_string(), "B".to_string()]);
        state.alive_players = state.lobby_players.clone();
        let mut cache = PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600));
        let mut nick_db = NickDatabase::default();
        let mut settings = Settings::default();
        assert!(!autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings));
    }

    #[test]
    fn aborts_when_two_unresolved_nicks_are_ambiguous() {
        let mut state = OverlayState::default();
        state.in_queue = true;
        state.party_members = HashSet::from(["Friend".to_string()]);
        let mut members = lobby_of(6);
        members.push("Nick1".to_string());
        members.push("Nick2".to_string());
        state.lobby_players = members.iter().cloned().collect();
        state.alive_players = state.lobby_players.clone();

        let mut cache = PlayerCache::new(Duration::from_secs(600), Duration::from_secs(3600));
        let mut nick_db = NickDatabase::default();
        let mut settings = Settings::default();
        let genus = cache.genus();
        for member in &members[..6] {
            cache.set_cached_player(
                member,
                Player::KnownPlayer {
                    username: member.clone(),
                    uuid: format!("uuid-{member}"),
                    stars: 100.0,
                    stats: stats(),
                    nick: None,
                    tags: None,
                },
                genus,
            );
        }
        cache.set_cached_player(
            "Nick1",
            Player::NickedPlayer {
                nick: "Nick1".to_string(),
            },
            genus,
        );
        cache.set_cached_player(
            "Nick2",
            Player::NickedPlayer {
                nick: "Nick2".to_string(),
            },
            genus,
        );

        assert!(!autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings));
    }
}
