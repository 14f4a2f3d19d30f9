//! Player data model: the stat bundle produced for a known player, and the
//! sum type covering every resolution state a lobby entry can be in.
//!
//! Stat formulas are grounded on `original_source/src/prism/overlay/player.py`
//! (`create_known_player`, `Stats`, `rate_player`, `sort_players`).

use std::cmp::Ordering;

/// Winstreak estimates for each Bed Wars mode. `None` means Hypixel (or our
/// winstreak estimator) doesn't have a value for that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Winstreaks {
    pub overall: Option<i64>,
    pub solo: Option<i64>,
    pub doubles: Option<i64>,
    pub threes: Option<i64>,
    pub fours: Option<i64>,
}

/// All winstreak fields missing; used when an estimate lookup fails.
pub const MISSING_WINSTREAKS: Winstreaks = Winstreaks {
    overall: None,
    solo: None,
    doubles: None,
    threes: None,
    fours: None,
};

/// Ratio stats plus the raw counters they were derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub index: f64,
    pub fkdr: f64,
    pub kdr: f64,
    pub bblr: f64,
    pub wlr: f64,
    pub winstreak: Option<i64>,
    pub winstreak_accurate: bool,
    pub kills: i64,
    pub finals: i64,
    pub beds: i64,
    pub wins: i64,
}

/// `a / b`, treating a zero denominator as the numerator itself (matching the
/// convention that e.g. a player with zero deaths has a kdr equal to their
/// kill count, not infinity or NaN).
fn safe_div(a: i64, b: i64) -> f64 {
    if b == 0 {
        a as f64
    } else {
        a as f64 / b as f64
    }
}

impl Stats {
    /// Build a `Stats` bundle from the raw Bed Wars stat counters Hypixel
    /// reports under `player.stats.Bedwars`, grounded on the exact formulas in
    /// `create_known_player`: `index = stars * fkdr^2`, winstreak defaults to
    /// `0` (marked accurate) only when Hypixel omits it AND the player has
    /// zero wins, and every ratio is `safe_div`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stars: f64,
        kills: i64,
        deaths: i64,
        finals: i64,
        final_deaths: i64,
        beds: i64,
        beds_lost: i64,
        wins: i64,
        games_played: i64,
        winstreak: Option<i64>,
    ) -> Stats {
        let fkdr = safe_div(finals, final_deaths);
        let (winstreak, winstreak_accurate) = match winstreak {
            Some(w) => (Some(w), true),
            None if wins == 0 => (Some(0), true),
            None => (None, false),
        };
        Stats {
            index: stars * fkdr * fkdr,
            fkdr,
            kdr: safe_div(kills, deaths),
            bblr: safe_div(beds, beds_lost),
            wlr: safe_div(wins, games_played - wins),
            winstreak,
            winstreak_accurate,
            kills,
            finals,
            beds,
            wins,
        }
    }

    /// Replace a missing/inaccurate winstreak with an estimate, unless we
    /// already have one from Hypixel or the existing value is already marked
    /// accurate.
    pub fn update_winstreak(&mut self, winstreak: Option<i64>, accurate: bool) {
        if self.winstreak_accurate {
            return;
        }
        if self.winstreak.is_some() && !accurate {
            return;
        }
        self.winstreak = winstreak;
        self.winstreak_accurate = accurate;
    }
}

/// A lobby/party member and everything we know or don't know about them.
#[derive(Debug, Clone, PartialEq)]
pub enum Player {
    /// Stats resolved successfully.
    KnownPlayer {
        username: String,
        uuid: String,
        stars: f64,
        stats: Stats,
        nick: Option<String>,
        tags: Option<Vec<String>>,
    },
    /// `username` is a nick we couldn't denick; stats are hidden entirely.
    NickedPlayer { nick: String },
    /// A fetch for this username is in flight.
    PendingPlayer { username: String },
    /// The fetch completed but found nothing worth showing (no UUID, or no
    /// Bed Wars stats for an existing account).
    UnknownPlayer { username: String },
}

impl Player {
    pub fn username(&self) -> &str {
        match self {
            Player::KnownPlayer { username, .. } => username,
            Player::NickedPlayer { nick } => nick,
            Player::PendingPlayer { username } => username,
            Player::UnknownPlayer { username } => username,
        }
    }

    /// Every name this player is reachable under: their real username plus,
    /// for a denicked player, the nick they were seen under in the lobby.
    pub fn aliases(&self) -> Vec<&str> {
        match self {
            Player::KnownPlayer { username, nick, .. } => {
                let mut v = vec![username.as_str()];
                if let Some(n) = nick {
                    v.push(n.as_str());
                }
                v
            }
            Player::NickedPlayer { nick } => vec![nick.as_str()],
            Player::PendingPlayer { username } => vec![username.as_str()],
            Player::UnknownPlayer { username } => vec![username.as_str()],
        }
    }

    /// Stats can't be displayed at all (nicked players, as opposed to pending
    /// or unknown players whose row still shows a username).
    pub fn stats_hidden(&self) -> bool {
        matches!(self, Player::NickedPlayer { .. })
    }
}

/// Columns the redraw aggregator can sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Username,
    Stars,
    Index,
    Fkdr,
    Kdr,
    Bblr,
    Wlr,
    Kills,
    Finals,
    Beds,
    Wins,
    Winstreak,
}

/// `(is_enemy, stats_hidden, column_value)` used as a reverse-sort key: enemies
/// sort above teammates, and within a group, worse stats/hidden stats sort
/// last. `is_enemy` is `true` when `username` is not in `party_members`.
fn rate_player(player: &Player, party_members: &[String], column: Column) -> (bool, bool, f64) {
    let is_enemy = !party_members
        .iter()
        .any(|m| m.eq_ignore_ascii_case(player.username()));
    let hidden = player.stats_hidden();

    let value = match player {
        Player::KnownPlayer { stars, stats, .. } => match column {
            Column::Username => 0.0,
            Column::Stars => *stars,
            Column::Index => stats.index,
            Column::Fkdr => stats.fkdr,
            Column::Kdr => stats.kdr,
            Column::Bblr => stats.bblr,
            Column::Wlr => stats.wlr,
            Column::Kills => stats.kills as f64,
            Column::Finals => stats.finals as f64,
            Column::Beds => stats.beds as f64,
            Column::Wins => stats.wins as f64,
            Column::Winstreak => stats.winstreak.map(|w| w as f64).unwrap_or(f64::INFINITY),
        },
        _ => {
            if column == Column::Username {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        }
    };

    (is_enemy, hidden, value)
}

/// Sort players for display: alphabetically by username first (a stable
/// pre-sort), then by `(is_enemy, !stats_hidden, column value)` descending, so
/// that the column sort wins except for ties, which fall back to alphabetical
/// order. Mirrors `sort_players`'s double-sort in the grounding source.
pub fn sort_players(players: &mut [Player], party_members: &[String], column: Column) {
    players.sort_by(|a, b| a.username().to_lowercase().cmp(&b.username().to_lowercase()));
    players.sort_by(|a, b| {
        let ra = rate_player(a, party_members, column);
        let rb = rate_player(b, party_members, column);
        // Reverse order (descending) using partial_cmp since values are f64.
        rb.0.cmp(&ra.0)
            .then(rb.1.cmp(&ra.1))
            .then(rb.2.partial_cmp(&ra.2).unwrap_or(Ordering::Equal))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_wins_and_missing_winstreak_defaults_to_accurate_zero() {
        let stats = Stats::new(100.0, 10, 5, 4, 2, 1, 0, 0, 0, None);
        assert_eq!(stats.winstreak, Some(0));
        assert!(stats.winstreak_accurate);
    }

    #[test]
    fn missing_winstreak_with_nonzero_wins_is_inaccurate_none() {
        let stats = Stats::new(100.0, 10, 5, 4, 2, 1, 0, 3, 10, None);
        assert_eq!(stats.winstreak, None);
        assert!(!stats.winstreak_accurate);
    }

    #[test]
    fn safe_div_zero_denominator_returns_numerator() {
        let stats = Stats::new(100.0, 10, 0, 4, 0, 1, 0, 3, 10, Some(5));
        assert_eq!(stats.kdr, 10.0);
        assert_eq!(stats.fkdr, 4.0);
        assert_eq!(stats.bblr, 1.0);
    }

    #[test]
    fn index_is_stars_times_fkdr_squared() {
        let stats = Stats::new(200.0, 0, 0, 8, 2, 0, 0, 0, 0, Some(0));
        assert_eq!(stats.fkdr, 4.0);
        assert_eq!(stats.index, 200.0 * 16.0);
    }

    #[test]
    fn update_winstreak_noop_when_already_accurate() {
        let mut stats = Stats::new(100.0, 0, 0, 0, 0, 0, 0, 0, 0, Some(7));
        stats.update_winstreak(Some(99), false);
        assert_eq!(stats.winstreak, Some(7));
    }

    #[test]
    fn sort_players_orders_enemies_above_teammates_by_column() {
        let party = vec!["Ally".to_string()];
        let mut players = vec![
            Player::KnownPlayer {
                username: "Ally".to_string(),
                uuid: "u1".to_string(),
                stars: 500.0,
                stats: Stats::new(500.0, 0, 0, 100, 10, 0, 0, 0, 0, Some(0)),
                nick: None,
                tags: None,
            },
            Player::KnownPlayer {
                username: "Enemy".to_string(),
                uuid: "u2".to_string(),
                stars: 100.0,
                stats: Stats::new(100.0, 0, 0, 5, 10, 0, 0, 0, 0, Some(0)),
                nick: None,
                tags: None,
            },
        ];
        sort_players(&mut players, &party, Column::Fkdr);
        assert_eq!(players[0].username(), "Enemy");
        assert_eq!(players[1].username(), "Ally");
    }
}
