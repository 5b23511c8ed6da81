use serde::{Deserialize, Serialize};

/// Which top-level keys an option applies to.
///
/// Serialized as `true`, `false` or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionRepr", into = "SelectionRepr")]
pub enum KeySelection {
    All,
    Nothing,
    Keys(Vec<String>),
}

impl KeySelection {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeySelection::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Whether `key`, or the top-level key owning a dotted `key`, is selected.
    pub fn covers(&self, key: &str) -> bool {
        match self {
            KeySelection::All => true,
            KeySelection::Nothing => false,
            KeySelection::Keys(keys) => {
                let owner = key.split('.').next().unwrap_or(key);
                keys.iter().any(|k| k == key || k == owner)
            }
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, KeySelection::Nothing) || matches!(self, KeySelection::Keys(k) if k.is_empty())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Flag(bool),
    Keys(Vec<String>),
}

impl From<SelectionRepr> for KeySelection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Flag(flag) => flag.into(),
            SelectionRepr::Keys(keys) => KeySelection::Keys(keys),
        }
    }
}

impl From<KeySelection> for SelectionRepr {
    fn from(selection: KeySelection) -> Self {
        match selection {
            KeySelection::All => SelectionRepr::Flag(true),
            KeySelection::Nothing => SelectionRepr::Flag(false),
            KeySelection::Keys(keys) => SelectionRepr::Keys(keys),
        }
    }
}

impl From<bool> for KeySelection {
    fn from(flag: bool) -> Self {
        if flag {
            KeySelection::All
        } else {
            KeySelection::Nothing
        }
    }
}

impl From<Vec<&str>> for KeySelection {
    fn from(keys: Vec<&str>) -> Self {
        KeySelection::keys(keys)
    }
}

impl From<Vec<String>> for KeySelection {
    fn from(keys: Vec<String>) -> Self {
        KeySelection::Keys(keys)
    }
}

/// Options for [`update_with`](crate::merge::update_with).
///
/// List directives use `key[:subkey]` syntax. The sub-key names the field
/// that identifies elements (`append_to_set`, `merge_to`, `remove_from`)
/// or orders them (`append_to`, with an optional `+`/`-` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    pub overwrite: KeySelection,
    pub append_to: Vec<String>,
    pub append_to_set: Vec<String>,
    pub merge_to: Vec<String>,
    pub remove_from: Vec<String>,
    pub flatten: KeySelection,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            overwrite: KeySelection::All,
            append_to: Vec::new(),
            append_to_set: Vec::new(),
            merge_to: Vec::new(),
            remove_from: Vec::new(),
            flatten: KeySelection::Nothing,
        }
    }
}

fn directives<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: impl Into<KeySelection>) -> Self {
        self.overwrite = overwrite.into();
        self
    }

    pub fn append_to<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.append_to = directives(items);
        self
    }

    pub fn append_to_set<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.append_to_set = directives(items);
        self
    }

    pub fn merge_to<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.merge_to = directives(items);
        self
    }

    pub fn remove_from<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.remove_from = directives(items);
        self
    }

    pub fn flatten(mut self, flatten: impl Into<KeySelection>) -> Self {
        self.flatten = flatten.into();
        self
    }
}
