//! Host key to emulator button mapping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::emulator::Button;

/// Keyboard mapping keyed by host key names
///
/// Key names follow the browser `KeyboardEvent.key` convention
/// (`"ArrowUp"`, `"Enter"`, `"x"`). Single-character keys match regardless of
/// case so a held Shift does not drop input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Button>",
    into = "BTreeMap<String, Button>"
)]
pub struct KeyboardMapping {
    keys: BTreeMap<String, Button>,
}

impl From<BTreeMap<String, Button>> for KeyboardMapping {
    fn from(keys: BTreeMap<String, Button>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(key, button)| (normalize(&key), button))
                .collect(),
        }
    }
}

impl From<KeyboardMapping> for BTreeMap<String, Button> {
    fn from(mapping: KeyboardMapping) -> Self {
        mapping.keys
    }
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        let keys = [
            ("ArrowUp", Button::Up),
            ("ArrowDown", Button::Down),
            ("ArrowLeft", Button::Left),
            ("ArrowRight", Button::Right),
            ("x", Button::A),
            ("z", Button::B),
            ("Enter", Button::Start),
            ("Backspace", Button::Select),
        ]
        .into_iter()
        .map(|(key, button)| (key.to_string(), button))
        .collect();

        Self { keys }
    }
}

impl KeyboardMapping {
    /// Mapping with no bindings
    pub fn empty() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// Bind `key` to `button`, replacing any previous binding for that key
    pub fn bind(&mut self, key: impl Into<String>, button: Button) {
        self.keys.insert(normalize(&key.into()), button);
    }

    pub fn unbind(&mut self, key: &str) -> Option<Button> {
        self.keys.remove(&normalize(key))
    }

    /// Button bound to a host key, if any
    pub fn button_for(&self, key: &str) -> Option<Button> {
        self.keys
            .get(key)
            .or_else(|| self.keys.get(&normalize(key)))
            .copied()
    }

    /// Keys bound to `button`
    pub fn keys_for(&self, button: Button) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(move |(_, b)| **b == button)
            .map(|(key, _)| key.as_str())
    }

    /// Buttons with no key bound
    pub fn unbound_buttons(&self) -> Vec<Button> {
        Button::ALL
            .into_iter()
            .filter(|button| self.keys_for(*button).next().is_none())
            .collect()
    }
}

fn normalize(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_lowercase().collect(),
        _ => key.to_string(),
    }
}
