//! Pure `line -> Option<Event>` parsing.
//!
//! Grounded on `original_source/src/prism/overlay/parsing.py`: the chat-prefix
//! table, rank/color stripping, and every per-message matcher below mirror
//! that file's logic line for line, translated into exhaustive Rust matches.

use crate::event::{Event, PartyRole};
use lazy_static::lazy_static;
use regex::Regex;

/// Launcher prefixes that introduce a client-state line (not chat).
/// Order doesn't matter for matching; the HIGHEST ending index wins because
/// some of these prefixes are suffixes of one another.
const CLIENT_INFO_PREFIXES: &[&str] = &[
    "(Client thread) Info ",
    "[Client thread/INFO]: ",
    "INFO]: [LC] ",
    "[Render thread/INFO]: ",
    "[Client thread/INFO]: [LC]",
];

/// Launcher prefixes that introduce a chat line. The LOWEST ending index wins
/// so a chat message cannot forge a fake prefix to be reparsed as something else.
const CHAT_PREFIXES: &[&str] = &[
    "(Client thread) Info [CHAT] ",
    "[Client thread/INFO]: [CHAT] ",
    "[Render thread/INFO]: [CHAT] ",
    "[Astolfo HTTP Bridge]: [CHAT] ",
];

const NETTY_CLIENT_FRAGMENT: &str = "[Netty Client IO #";
const NETTY_CHAT_FRAGMENT: &str = "/INFO]: [CHAT] ";

const PUNCTUATION_AND_WHITESPACE: &[char] = &['.', '!', ':', ',', ' ', '\t'];

lazy_static! {
    static ref RANK_REGEX: Regex = Regex::new(r"\[[a-zA-Z+]+\] ").unwrap();
    static ref COLOR_REGEX: Regex = Regex::new("[\u{00A7}\u{FFFD}][0-9a-fklmnor]").unwrap();
    static ref LOBBY_FILL_REGEX: Regex = Regex::new(r"^\(\d+/\d+\)!$").unwrap();
}

fn strip_until<'a>(line: &'a str, until: &str) -> &'a str {
    match line.find(until) {
        Some(idx) => line[idx + until.len()..].trim_end(),
        None => line,
    }
}

fn remove_colors(s: &str) -> String {
    COLOR_REGEX.replace_all(s, "").into_owned()
}

fn remove_ranks(s: &str) -> String {
    RANK_REGEX.replace_all(s, "").into_owned()
}

/// Returns the string in `strings` whose match in `source` ends at the lowest
/// index, or `None` if none of them occur.
fn get_lowest_index<'a>(source: &str, strings: &[&'a str]) -> Option<&'a str> {
    strings
        .iter()
        .filter_map(|s| source.find(s).map(|i| (i + s.len(), *s)))
        .min_by_key(|(end, _)| *end)
        .map(|(_, s)| s)
}

/// Returns the string in `strings` whose match in `source` ends at the highest
/// index, or `None` if none of them occur.
fn get_highest_index<'a>(source: &str, strings: &[&'a str]) -> Option<&'a str> {
    strings
        .iter()
        .filter_map(|s| source.find(s).map(|i| (i + s.len(), *s)))
        .max_by_key(|(end, _)| *end)
        .map(|(_, s)| s)
}

fn words_match(words: &[&str], target: &str) -> bool {
    words.join(" ").trim_matches(PUNCTUATION_AND_WHITESPACE)
        == target.trim_matches(PUNCTUATION_AND_WHITESPACE)
}

/// Length in `[1,25]`, characters in `[A-Za-z0-9_]`.
pub fn valid_username(username: &str) -> bool {
    if username.is_empty() || username.chars().count() > 25 {
        return false;
    }
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip a trailing `[xN]` chat-deduplication counter, if present.
fn remove_deduplication_suffix(message: &str) -> &str {
    if !message.ends_with(']') {
        return message;
    }
    let Some(last_space) = message.rfind(' ') else {
        return message;
    };
    let lastword = &message[last_space + 1..];
    if let Some(digits) = lastword.strip_prefix("[x").and_then(|s| s.strip_suffix(']')) {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return message[..last_space].trim_end();
        }
    }
    message
}

/// Parse one raw log line. Returns `None` if the line carries no event we
/// model, either because it's not a recognized prefix or the payload didn't
/// match any known shape.
pub fn parse_line(line: &str) -> Option<Event> {
    if let Some(chat_prefix) = get_lowest_index(line, CHAT_PREFIXES) {
        return parse_chat_message(strip_until(line, chat_prefix));
    }

    // Horrible special case: Astolfo-style Netty bridge with a numeric thread id,
    // e.g. "[Netty Client IO #7/INFO]: [CHAT] ...".
    if let (Some(client_index), Some(chat_index)) = (
        line.find(NETTY_CLIENT_FRAGMENT),
        line.find(NETTY_CHAT_FRAGMENT),
    ) {
        let gap = chat_index as isize - (client_index + NETTY_CLIENT_FRAGMENT.len()) as isize;
        if client_index < chat_index && (0..=3).contains(&gap) {
            let until = &line[..chat_index + NETTY_CHAT_FRAGMENT.len()];
            return parse_chat_message(strip_until(line, until));
        }
    }

    // These lines are not user-controlled (chat lines are already ruled out
    // above), so we're safe to take the highest-index match even though some
    // prefixes are suffixes of others.
    if let Some(info_prefix) = get_highest_index(line, CLIENT_INFO_PREFIXES) {
        return parse_client_info(strip_until(line, info_prefix));
    }

    None
}

fn parse_client_info(info: &str) -> Option<Event> {
    const SETTING_USER_PREFIX: &str = "Setting user: ";
    if let Some(username) = info.strip_prefix(SETTING_USER_PREFIX) {
        return Some(Event::InitializeAs {
            username: username.trim_end().to_string(),
        });
    }
    None
}

fn parse_chat_message(message: &str) -> Option<Event> {
    const WHO_PREFIX: &str = "ONLINE: ";

    let message = remove_colors(remove_deduplication_suffix(message));
    let message = message.as_str();

    if let Some(rest) = message.strip_prefix(WHO_PREFIX) {
        let usernames = rest.split(", ").map(|s| s.to_string()).collect();
        return Some(Event::LobbyList { usernames });
    }

    if message.starts_with("You are now nicked as ") {
        let words: Vec<&str> = message.split(' ').collect();
        if words.is_empty() || !words_match(&words[..words.len() - 1], "You are now nicked as") {
            return None;
        }
        let nick = words[words.len() - 1]
            .trim_matches(PUNCTUATION_AND_WHITESPACE)
            .to_string();
        return Some(Event::NewNickname { nick });
    }

    if message.starts_with("Sending you to ") {
        return Some(Event::LobbySwap);
    }

    if message.trim_matches(PUNCTUATION_AND_WHITESPACE)
        == "You were sent to a lobby because someone in your party left"
    {
        return Some(Event::LobbySwap);
    }

    if message.starts_with("The game starts in ") {
        let words: Vec<&str> = message.split(' ').collect();
        if words.len() != 6 {
            return None;
        }
        let unit = words[5].trim_matches(PUNCTUATION_AND_WHITESPACE);
        if (unit != "second" && unit != "seconds") || words[4].parse::<u32>().is_err() {
            return None;
        }
        let seconds: u32 = words[4].parse().ok()?;
        return Some(Event::BedwarsGameStartingSoon { seconds });
    }

    // Also appears at the end of a game, before the end-game event; harmless
    // since StartBedwarsGame followed immediately by EndBedwarsGame is a no-op.
    if message.trim_start().starts_with("Bed Wars") {
        return Some(Event::StartBedwarsGame);
    }

    if message.trim_matches(PUNCTUATION_AND_WHITESPACE).ends_with("FINAL KILL")
        && message.matches(' ').count() > 2
    {
        let words: Vec<&str> = message.split(' ').collect();
        if words.len() >= 4 && words[1] == ">" {
            // "Party > Player 1: inc please void FINAL KILL!"
            return None;
        }
        let dead_player = words[0];
        if !valid_username(dead_player) {
            return None;
        }
        return Some(Event::BedwarsFinalKill {
            dead_player: dead_player.to_string(),
            raw_message: message.to_string(),
        });
    }

    if message.trim_matches(PUNCTUATION_AND_WHITESPACE).ends_with("disconnected")
        && message.matches(' ').count() == 1
    {
        let username = message.split(' ').next().unwrap_or("");
        if !valid_username(username) {
            return None;
        }
        return Some(Event::BedwarsDisconnect {
            username: username.to_string(),
        });
    }

    if message.trim_matches(PUNCTUATION_AND_WHITESPACE).ends_with("reconnected")
        && message.matches(' ').count() == 1
    {
        let username = message.split(' ').next().unwrap_or("");
        if !valid_username(username) {
            return None;
        }
        return Some(Event::BedwarsReconnect {
            username: username.to_string(),
        });
    }

    if message.trim_start().starts_with("1st Killer") {
        return Some(Event::EndBedwarsGame);
    }

    if message.contains(" has joined (") {
        let words: Vec<&str> = message.split(' ').collect();
        if words.len() < 4 || !words_match(&words[1..3], "has joined") {
            return None;
        }
        let username = words[0];
        let fill = words[3];
        if !LOBBY_FILL_REGEX.is_match(fill) {
            return None;
        }
        let inner = &fill[1..fill.len() - 2]; // strip '(' and ')!'
        let (count_str, cap_str) = inner.split_once('/')?;
        let count: u32 = count_str.parse().ok()?;
        let cap: u32 = cap_str.parse().ok()?;
        return Some(Event::LobbyJoin {
            username: username.to_string(),
            count,
            cap,
        });
    }

    if message.contains(" has quit") {
        let words: Vec<&str> = message.split(' ').collect();
        if words.len() < 3 || !words_match(&words[1..3], "has quit!") {
            return None;
        }
        return Some(Event::LobbyLeave {
            username: words[0].to_string(),
        });
    }

    if message.starts_with("You left the party") {
        return Some(Event::PartyDetach);
    }

    if message.starts_with("You are not currently in a party") {
        return Some(Event::PartyDetach);
    }

    if message.trim_matches(PUNCTUATION_AND_WHITESPACE)
        == "The party was disbanded because all invites expired and the party was empty"
    {
        return Some(Event::PartyDetach);
    }

    if message.contains(" has disbanded the party") {
        let cleaned = remove_ranks(message);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 5 || !words_match(&words[1..], "has disbanded the party!") {
            return None;
        }
        return Some(Event::PartyDetach);
    }

    if message.starts_with("You have been kicked from the party by ") {
        return Some(Event::PartyDetach);
    }

    const PARTY_YOU_JOIN_PREFIX: &str = "You have joined ";
    if let Some(suffix) = message.strip_prefix(PARTY_YOU_JOIN_PREFIX) {
        let apostrophe_index = suffix.find('\'')?;
        let leader_username = remove_ranks(&suffix[..apostrophe_index]);
        return Some(Event::PartyAttach { leader_username });
    }

    const PARTYING_WITH_PREFIX: &str = "You'll be partying with: ";
    if let Some(suffix) = message.strip_prefix(PARTYING_WITH_PREFIX) {
        let names = remove_ranks(suffix);
        let usernames = names.split(", ").map(|s| s.to_string()).collect();
        return Some(Event::PartyJoin { usernames });
    }

    if message.contains(" joined the party") {
        let cleaned = remove_ranks(message);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 4 || !words_match(&words[1..4], "joined the party.") {
            return None;
        }
        return Some(Event::PartyJoin {
            usernames: vec![words[0].to_string()],
        });
    }

    if message.contains(" has left the party") {
        let cleaned = remove_ranks(message);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 5 || !words_match(&words[1..5], "has left the party.") {
            return None;
        }
        return Some(Event::PartyLeave {
            usernames: vec![words[0].to_string()],
        });
    }

    if message.contains(" has been removed from the party") {
        let cleaned = remove_ranks(message);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 7 || !words_match(&words[1..], "has been removed from the party.") {
            return None;
        }
        return Some(Event::PartyLeave {
            usernames: vec![words[0].to_string()],
        });
    }

    if message.contains(" was removed from the party because they disconnected")
        || message.contains(" was removed from your party because they disconnected")
    {
        let cleaned = remove_ranks(message);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 9 {
            return None;
        }
        let matches_a = words_match(
            &words[1..],
            "was removed from the party because they disconnected",
        );
        let matches_b = words_match(
            &words[1..],
            "was removed from your party because they disconnected.",
        );
        if !matches_a && !matches_b {
            return None;
        }
        return Some(Event::PartyLeave {
            usernames: vec![words[0].to_string()],
        });
    }

    const PARTY_KICK_OFFLINE_PREFIX: &str = "Kicked ";
    if message.starts_with(PARTY_KICK_OFFLINE_PREFIX)
        && message.contains(" because they were offline")
    {
        let suffix = &message[PARTY_KICK_OFFLINE_PREFIX.len()..];
        let cleaned = remove_ranks(suffix);
        let words: Vec<&str> = cleaned.split(' ').collect();
        if words.len() < 5 || !words_match(&words[words.len() - 4..], "because they were offline.") {
            return None;
        }
        let usernames = words[..words.len() - 4]
            .join(" ")
            .split(", ")
            .map(|s| s.to_string())
            .collect();
        return Some(Event::PartyLeave { usernames });
    }

    const TRANSFER_PREFIX: &str = "The party was transferred to ";
    if let Some(suffix) = message.strip_prefix(TRANSFER_PREFIX) {
        let without_ranks = remove_ranks(suffix);
        let words: Vec<&str> = without_ranks.split(' ').collect();
        if words.len() < 4 {
            return None;
        }
        let stride: Vec<&str> = words.iter().skip(1).step_by(2).copied().collect();
        if !words_match(&stride, "because left") {
            return None;
        }
        return Some(Event::PartyLeave {
            usernames: vec![words[2].to_string()],
        });
    }

    if message.starts_with("Party Members (") {
        return Some(Event::PartyListIncoming);
    }

    for (prefix, role) in [
        ("Party Leader: ", PartyRole::Leader),
        ("Party Moderators: ", PartyRole::Moderators),
        ("Party Members: ", PartyRole::Members),
    ] {
        if let Some(suffix) = message.strip_prefix(prefix) {
            let dirty = remove_ranks(suffix);
            let clean = dirty
                .trim()
                .replace(" \u{25CF}", "")
                .replace(" ?", "")
                .replace(" \u{FFFD}", "");
            let usernames = clean.split(' ').map(|s| s.to_string()).collect();
            return Some(Event::PartyMembershipList { usernames, role });
        }
    }

    const NEW_API_KEY_PREFIX: &str = "Your new API key is ";
    if let Some(key) = message.strip_prefix(NEW_API_KEY_PREFIX) {
        let key = key.trim_matches(PUNCTUATION_AND_WHITESPACE).to_string();
        return Some(Event::NewAPIKey { key });
    }

    const WHISPER_COMMAND_PREFIX: &str = "Can't find a player by the name of '!";
    if let Some(command) = message.strip_prefix(WHISPER_COMMAND_PREFIX) {
        if command.is_empty() || !command.ends_with('\'') {
            return None;
        }
        let command = &command[..command.len() - 1];
        if let Some((nick, username)) = command.split_once('=') {
            if command.matches('=').count() != 1 {
                return None;
            }
            return Some(Event::WhisperCommandSetNick {
                nick: nick.to_string(),
                username: if username.is_empty() {
                    None
                } else {
                    Some(username.to_string())
                },
            });
        }
        return None;
    }

    if let Some(colon_index) = message.find(':') {
        let username = remove_ranks(&message[..colon_index]);
        if !valid_username(&username) {
            return None;
        }
        if message.len() <= colon_index + 1 || message.as_bytes()[colon_index + 1] != b' ' {
            return None;
        }
        let player_message = message[colon_index + 2..].to_string();
        return Some(Event::ChatMessage {
            username,
            message: player_message,
        });
    }

    None
}
