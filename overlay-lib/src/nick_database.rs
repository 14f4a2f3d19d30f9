//! Nick -> uuid resolution, layered so that a user-editable set of known
//! nicks can be overridden or supplemented by read-only databases (e.g. a
//! bundled denick database shipped with the overlay).
//!
//! Grounded on the `known_nicks` settings table plus the `nick_database`
//! argument threaded through `original_source/src/prism/overlay/behaviour.py`
//! and `get_stats.py`'s `denick`.

use std::collections::HashMap;

/// Nick -> uuid lookup, with one mutable user-editable layer checked first and
/// any number of read-only fallback layers checked after it in order.
#[derive(Debug, Clone, Default)]
pub struct NickDatabase {
    default_layer: HashMap<String, String>,
    other_layers: Vec<HashMap<String, String>>,
}

impl NickDatabase {
    pub fn new(default_layer: HashMap<String, String>, other_layers: Vec<HashMap<String, String>>) -> Self {
        NickDatabase {
            default_layer,
            other_layers,
        }
    }

    /// Look up `nick` in the mutable default layer only. Used by auto-denick,
    /// which only trusts nicks the user (or a prior auto-denick) has recorded
    /// themselves, not a bundled third-party database.
    pub fn get_default(&self, nick: &str) -> Option<&str> {
        self.default_layer.get(nick).map(|s| s.as_str())
    }

    /// Look up `nick` in the default layer, then each fallback layer in
    /// order, returning the first hit.
    pub fn get(&self, nick: &str) -> Option<&str> {
        if let Some(uuid) = self.default_layer.get(nick) {
            return Some(uuid);
        }
        self.other_layers.iter().find_map(|layer| layer.get(nick).map(|s| s.as_str()))
    }

    /// Record or overwrite a nick in the mutable default layer.
    pub fn set_default(&mut self, nick: String, uuid: String) {
        self.default_layer.insert(nick, uuid);
    }

    /// Remove a nick from the mutable default layer, if present.
    pub fn remove_default(&mut self, nick: &str) -> Option<String> {
        self.default_layer.remove(nick)
    }

    pub fn default_layer(&self) -> &HashMap<String, String> {
        &self.default_layer
    }
}
