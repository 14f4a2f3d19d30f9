/// The role a set of usernames was reported under in a `/pl` (party list) response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Leader,
    Moderators,
    Members,
}

/// A single structured fact extracted from one chat log line.
///
/// This is the complete set of variants the parser can produce; the event
/// processor is written as an exhaustive match over this enum so that adding
/// a new chat shape requires updating both sides deliberately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The client announced its local username (`Setting user: <name>`).
    InitializeAs { username: String },

    /// Chat confirmed the user's new nick (`You are now nicked as <nick>!`).
    NewNickname { nick: String },

    /// The user was sent to a new lobby; the old lobby roster is stale.
    LobbySwap,

    /// A player joined the lobby. `count`/`cap` are the counters Hypixel reported
    /// in the same message, used to detect drift from our own roster.
    LobbyJoin {
        username: String,
        count: u32,
        cap: u32,
    },

    /// A player left the lobby.
    LobbyLeave { username: String },

    /// Authoritative roster from `/who`.
    LobbyList { usernames: Vec<String> },

    /// The user joined someone else's party (`You have joined <leader>'s party!`).
    PartyAttach { leader_username: String },

    /// The user left or was removed from the party.
    PartyDetach,

    /// One or more players joined the user's party.
    PartyJoin { usernames: Vec<String> },

    /// One or more players left the user's party.
    PartyLeave { usernames: Vec<String> },

    /// Header line of a `/pl` response; role lines follow.
    PartyListIncoming,

    /// One role's worth of party members from a `/pl` response.
    PartyMembershipList {
        usernames: Vec<String>,
        role: PartyRole,
    },

    /// Bed Wars has started.
    StartBedwarsGame,

    /// Bed Wars has ended (the "1st Killer" recap line).
    EndBedwarsGame,

    /// "The game starts in N seconds" countdown tick.
    BedwarsGameStartingSoon { seconds: u32 },

    /// A player was given a final kill.
    BedwarsFinalKill {
        dead_player: String,
        raw_message: String,
    },

    /// A lobby member disconnected mid-game.
    BedwarsDisconnect { username: String },

    /// A previously-disconnected lobby member reconnected.
    BedwarsReconnect { username: String },

    /// User supplied a new Hypixel API key.
    NewAPIKey { key: String },

    /// User typed `/w !nick=username` (or `/w !nick=` to clear).
    WhisperCommandSetNick {
        nick: String,
        username: Option<String>,
    },

    /// An ordinary chat message from a player.
    ChatMessage { username: String, message: String },
}
