//! Persisted show/hide state of the chart

use crate::error::Result;
use crate::store::KeyValueStore;

/// Storage key of the hidden flag
pub const HIDDEN_KEY: &str = "chartHeaderHidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn is_hidden(self) -> bool {
        self == Visibility::Hidden
    }

    pub fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }
}

/// Reads and writes the hidden flag through a [`KeyValueStore`]
#[derive(Debug)]
pub struct VisibilityStore<S> {
    store: S,
}

impl<S: KeyValueStore> VisibilityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persisted visibility; anything but `"true"` counts as visible
    pub fn load(&self) -> Visibility {
        Visibility::from_hidden(self.store.get(HIDDEN_KEY).as_deref() == Some("true"))
    }

    pub fn save(&mut self, visibility: Visibility) -> Result<()> {
        let value = if visibility.is_hidden() { "true" } else { "false" };
        self.store.set(HIDDEN_KEY, value)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_default_is_visible() {
        let state = VisibilityStore::new(MemoryStore::new());
        assert_eq!(state.load(), Visibility::Visible);
    }

    #[test]
    fn test_save_and_load() {
        let mut state = VisibilityStore::new(MemoryStore::new());
        state.save(Visibility::Hidden).unwrap();
        assert_eq!(state.load(), Visibility::Hidden);
        state.save(Visibility::Visible).unwrap();
        assert_eq!(state.load(), Visibility::Visible);

        let store = state.into_inner();
        assert_eq!(store.get(HIDDEN_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn test_unexpected_value_is_visible() {
        let mut store = MemoryStore::new();
        store.set(HIDDEN_KEY, "yes").unwrap();
        assert_eq!(VisibilityStore::new(store).load(), Visibility::Visible);
    }

    #[test]
    fn test_toggled() {
        assert_eq!(Visibility::Visible.toggled(), Visibility::Hidden);
        assert_eq!(Visibility::Visible.toggled().toggled(), Visibility::Visible);
    }
}
