//! Turns a lobby username into a resolved `Player`, denicking through the
//! nick database when Hypixel doesn't recognize the name directly.
//!
//! Grounded on `original_source/src/prism/overlay/get_stats.py`'s
//! `fetch_bedwars_stats` (uuid lookup -> denick-on-miss -> playerdata fetch ->
//! displayname-mismatch retry -> stat construction) and `player.py`'s
//! `create_known_player` stat formulas (used by `crate::player::Stats::new`).

use std::sync::Arc;

use crate::fetch::{FetchErrorKind, StatsBackend};
use crate::nick_database::NickDatabase;
use crate::player::{Player, Stats};

pub struct Assembler {
    backend: Arc<dyn StatsBackend>,
}

impl Assembler {
    pub fn new(backend: Arc<dyn StatsBackend>) -> Self {
        Assembler { backend }
    }

    /// Resolve `username` (which may itself be a nick) into a `Player`.
    pub fn fetch_player(
        &self,
        username: &str,
        nick_database: &NickDatabase,
    ) -> Result<Player, FetchErrorKind> {
        self.fetch_player_inner(username, nick_database, false)
    }

    fn fetch_player_inner(
        &self,
        username: &str,
        nick_database: &NickDatabase,
        already_denicked: bool,
    ) -> Result<Player, FetchErrorKind> {
        let uuid = match self.backend.lookup_uuid(username)? {
            Some(uuid) => uuid,
            None => return self.denick_and_retry(username, nick_database, already_denicked),
        };

        let playerdata = match self.backend.fetch_playerdata(&uuid)? {
            Some(data) => data,
            None => return self.denick_and_retry(username, nick_database, already_denicked),
        };

        // If this wasn't already a denick attempt, and Hypixel's displayname
        // for this uuid doesn't match the name we queried, the account has
        // since changed name; the name we have must actually be a nick.
        if !already_denicked {
            if let Some(displayname) = playerdata.get("displayname").and_then(|v| v.as_str()) {
                if !displayname.eq_ignore_ascii_case(username) {
                    return self.denick_and_retry(username, nick_database, already_denicked);
                }
            }
        }

        let player = build_known_player(&playerdata, username, &uuid)?;
        Ok(if already_denicked {
            attach_nick(player, username)
        } else {
            player
        })
    }

    fn denick_and_retry(
        &self,
        nick: &str,
        nick_database: &NickDatabase,
        already_denicked: bool,
    ) -> Result<Player, FetchErrorKind> {
        if already_denicked {
            // Already tried the denicked username and it still didn't
            // resolve; don't loop forever chasing a stale nick-database entry.
            return Ok(Player::UnknownPlayer {
                username: nick.to_string(),
            });
        }
        match nick_database.get(nick) {
            Some(real_username) => {
                let real_username = real_username.to_string();
                self.fetch_player_inner(&real_username, nick_database, true)
                    .map(|player| attach_nick(player, nick))
            }
            None => Ok(Player::NickedPlayer {
                nick: nick.to_string(),
            }),
        }
    }

    pub fn fetch_winstreaks(&self, uuid: &str) -> Result<crate::player::Winstreaks, FetchErrorKind> {
        self.backend.fetch_winstreaks(uuid)
    }
}

fn attach_nick(player: Player, nick: &str) -> Player {
    match player {
        Player::KnownPlayer {
            username,
            uuid,
            stars,
            stats,
            tags,
            ..
        } => Player::KnownPlayer {
            username,
            uuid,
            stars,
            stats,
            nick: Some(nick.to_string()),
            tags,
        },
        other => other,
    }
}

fn build_known_player(
    data: &serde_json::Value,
    username: &str,
    uuid: &str,
) -> Result<Player, FetchErrorKind> {
    let bedwars = data.pointer("/stats/Bedwars");
    let get_i64 = |key: &str| {
        bedwars
            .and_then(|b| b.get(key))
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    };

    let stars = data
        .pointer("/achievements/bedwars_level")
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0);

    let winstreak = bedwars.and_then(|b| b.get("winstreak")).and_then(|v| v.as_i64());

    let stats = Stats::new(
        stars,
        get_i64("kills_bedwars"),
        get_i64("deaths_bedwars"),
        get_i64("final_kills_bedwars"),
        get_i64("final_deaths_bedwars"),
        get_i64("beds_broken_bedwars"),
        get_i64("beds_lost_bedwars"),
        get_i64("wins_bedwars"),
        get_i64("games_played_bedwars"),
        winstreak,
    );

    Ok(Player::KnownPlayer {
        username: username.to_string(),
        uuid: uuid.to_string(),
        stars,
        stats,
        nick: None,
        tags: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Winstreaks;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeBackend {
        uuids: HashMap<String, String>,
        playerdata: HashMap<String, serde_json::Value>,
        calls: Mutex<Vec<String>>,
    }

    impl StatsBackend for FakeBackend {
        fn lookup_uuid(&self, username: &str) -> Result<Option<String>, FetchErrorKind> {
            self.calls.lock().unwrap().push(format!("uuid:{username}"));
            Ok(self.uuids.get(username).cloned())
        }

        fn fetch_playerdata(&self, uuid: &str) -> Result<Option<serde_json::Value>, FetchErrorKind> {
            self.calls.lock().unwrap().push(format!("playerdata:{uuid}"));
            Ok(self.playerdata.get(uuid).cloned())
        }

        fn fetch_winstreaks(&self, _uuid: &str) -> Result<Winstreaks, FetchErrorKind> {
            Ok(Winstreaks::default())
        }
    }

    fn bw_data(displayname: &str) -> serde_json::Value {
        serde_json::json!({
            "displayname": displayname,
            "achievements": {"bedwars_level": 150.0},
            "stats": {
                "Bedwars": {
                    "kills_bedwars": 100,
                    "deaths_bedwars": 50,
                    "final_kills_bedwars": 40,
                    "final_deaths_bedwars": 10,
                    "beds_broken_bedwars": 30,
                    "beds_lost_bedwars": 20,
                    "wins_bedwars": 25,
                    "games_played_bedwars": 60,
                    "winstreak": 3,
                }
            }
        })
    }

    #[test]
    fn direct_lookup_hit_builds_known_player() {
        let mut uuids = HashMap::new();
        uuids.insert("Real".to_string(), "uuid-1".to_string());
        let mut playerdata = HashMap::new();
        playerdata.insert("uuid-1".to_string(), bw_data("Real"));
        let backend = Arc::new(FakeBackend {
            uuids,
            playerdata,
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let nick_db = NickDatabase::default();

        let player = assembler.fetch_player("Real", &nick_db).unwrap();
        match player {
            Player::KnownPlayer { username, nick, stats, .. } => {
                assert_eq!(username, "Real");
                assert_eq!(nick, None);
                assert_eq!(stats.fkdr, 4.0);
            }
            other => panic!("expected KnownPlayer, got {other:?}"),
        }
    }

    #[test]
    fn unresolvable_unknown_nick_becomes_nicked_player() {
        let backend = Arc::new(FakeBackend {
            uuids: HashMap::new(),
            playerdata: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let nick_db = NickDatabase::default();

        let player = assembler.fetch_player("MysteryNick", &nick_db).unwrap();
        assert_eq!(
            player,
            Player::NickedPlayer {
                nick: "MysteryNick".to_string()
            }
        );
    }

    #[test]
    fn denick_fallback_resolves_via_nick_database() {
        let mut uuids = HashMap::new();
        uuids.insert("RealName".to_string(), "uuid-2".to_string());
        let mut playerdata = HashMap::new();
        playerdata.insert("uuid-2".to_string(), bw_data("RealName"));
        let backend = Arc::new(FakeBackend {
            uuids,
            playerdata,
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let mut nick_db = NickDatabase::default();
        nick_db.set_default("SneakyNick".to_string(), "RealName".to_string());

        let player = assembler.fetch_player("SneakyNick", &nick_db).unwrap();
        match player {
            Player::KnownPlayer { username, nick, .. } => {
                assert_eq!(username, "RealName");
                assert_eq!(nick, Some("SneakyNick".to_string()));
            }
            other => panic!("expected KnownPlayer, got {other:?}"),
        }
    }

    #[test]
    fn displayname_mismatch_triggers_denick_retry() {
        // "OldName" uuid-resolves directly, but Hypixel now reports a
        // different displayname for that uuid: our nick-database entry for
        // "OldName" as a nick of "NewOwner" should be tried instead.
        let mut uuids = HashMap::new();
        uuids.insert("OldName".to_string(), "uuid-3".to_string());
        uuids.insert("NewOwner".to_string(), "uuid-4".to_string());
        let mut playerdata = HashMap::new();
        playerdata.insert("uuid-3".to_string(), bw_data("SomeoneElseNow"));
        playerdata.insert("uuid-4".to_string(), bw_data("NewOwner"));
        let backend = Arc::new(FakeBackend {
            uuids,
            playerdata,
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let mut nick_db = NickDatabase::default();
        nick_db.set_default("OldName".to_string(), "NewOwner".to_string());

        let player = assembler.fetch_player("OldName", &nick_db).unwrap();
        match player {
            Player::KnownPlayer { username, nick, .. } => {
                assert_eq!(username, "NewOwner");
                assert_eq!(nick, Some("OldName".to_string()));
            }
            other => panic!("expected KnownPlayer, got {other:?}"),
        }
    }

    // A uuid that resolves but has no Hypixel playerdata (account exists,
    // no record) falls back to the denick chain rather than immediately
    // becoming UnknownPlayer, same as the lookup_uuid-miss branch.
    #[test]
    fn missing_playerdata_falls_back_to_denick_chain() {
        let mut uuids = HashMap::new();
        uuids.insert("GhostName".to_string(), "uuid-5".to_string());
        uuids.insert("RealOwner".to_string(), "uuid-6".to_string());
        let mut playerdata = HashMap::new();
        playerdata.insert("uuid-6".to_string(), bw_data("RealOwner"));
        let backend = Arc::new(FakeBackend {
            uuids,
            playerdata,
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let mut nick_db = NickDatabase::default();
        nick_db.set_default("GhostName".to_string(), "RealOwner".to_string());

        let player = assembler.fetch_player("GhostName", &nick_db).unwrap();
        match player {
            Player::KnownPlayer { username, nick, .. } => {
                assert_eq!(username, "RealOwner");
                assert_eq!(nick, Some("GhostName".to_string()));
            }
            other => panic!("expected KnownPlayer, got {other:?}"),
        }
    }

    // With no nick-database entry to fall back to, a missing-playerdata
    // lookup terminates in NickedPlayer, matching the lookup_uuid-miss
    // terminal case.
    #[test]
    fn missing_playerdata_with_no_nick_entry_becomes_nicked_player() {
        let mut uuids = HashMap::new();
        uuids.insert("GhostName".to_string(), "uuid-5".to_string());
        let backend = Arc::new(FakeBackend {
            uuids,
            playerdata: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        });
        let assembler = Assembler::new(backend);
        let nick_db = NickDatabase::default();

        let player = assembler.fetch_player("GhostName", &nick_db).unwrap();
        assert_eq!(
            player,
            Player::NickedPlayer {
                nick: "GhostName".to_string()
            }
        );
    }
}
