//! Console output sink: a plain table printer, standing in for the GUI
//! surface that's explicitly out of scope for this crate.

use overlay_lib::player::Player;

pub fn render_table(players: &[Player], own_username: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8}\n",
        "username", "stars", "fkdr", "wlr", "wins", "ws"
    ));
    for player in players {
        let marker = if Some(player.username()) == own_username {
            "*"
        } else {
            " "
        };
        match player {
            Player::KnownPlayer { username, stars, stats, nick, .. } => {
                let display_name = match nick {
                    Some(nick) => format!("{username} ({nick})"),
                    None => username.clone(),
                };
                out.push_str(&format!(
                    "{marker}{:<19} {:>8.1} {:>8.2} {:>8.2} {:>8} {:>8}\n",
                    display_name,
                    stars,
                    stats.fkdr,
                    stats.wlr,
                    stats.wins,
                    stats
                        .winstreak
                        .map(|w| w.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                ));
            }
            Player::NickedPlayer { nick } => {
                out.push_str(&format!("{marker}{nick:<19} {:>8}\n", "nicked"));
            }
            Player::PendingPlayer { username } => {
                out.push_str(&format!("{marker}{username:<19} {:>8}\n", "..."));
            }
            Player::UnknownPlayer { username } => {
                out.push_str(&format!("{marker}{username:<19} {:>8}\n", "unknown"));
            }
        }
    }
    out
}
