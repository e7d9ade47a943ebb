//! Locale state: the single shared "which language is on screen" cell.
//! Injected as `Arc<LocaleState>`; subscribers get a watch channel so a
//! change can schedule a full pass on the next tick.

use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

/// The two display languages. UI copy is authored in `Source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    /// Russian, the authoring language.
    #[default]
    #[serde(rename = "ru")]
    Source,
    /// English, the only alternate.
    #[serde(rename = "en")]
    Target,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::Source => "ru",
            Locale::Target => "en",
        }
    }

    pub fn toggled(self) -> Locale {
        match self {
            Locale::Source => Locale::Target,
            Locale::Target => Locale::Source,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocale(pub String);

impl std::fmt::Display for UnknownLocale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown locale: {} (expected ru or en)", self.0)
    }
}

impl std::error::Error for UnknownLocale {}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" | "source" => Ok(Locale::Source),
            "en" | "en-us" | "en-gb" | "target" => Ok(Locale::Target),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

/// Shared locale cell with a watch channel for reactive subscribers.
pub struct LocaleState {
    locale: RwLock<Locale>,
    locale_tx: watch::Sender<Locale>,
    locale_rx: watch::Receiver<Locale>,
}

impl LocaleState {
    pub fn new(initial: Locale) -> Self {
        let (locale_tx, locale_rx) = watch::channel(initial);
        Self {
            locale: RwLock::new(initial),
            locale_tx,
            locale_rx,
        }
    }

    /// Current locale (non-blocking read).
    pub fn current(&self) -> Locale {
        *self.locale.read()
    }

    /// The only setter. Returns false when `next` is already current.
    pub fn set(&self, next: Locale) -> bool {
        let mut locale = self.locale.write();
        let prev = *locale;
        if prev == next {
            debug!(locale = %next, "locale_unchanged");
            return false;
        }
        *locale = next;
        let _ = self.locale_tx.send(next);
        info!(from = %prev, to = %next, "locale_changed");
        true
    }

    pub fn toggle(&self) -> Locale {
        let next = self.current().toggled();
        self.set(next);
        next
    }

    /// Subscribe to locale changes.
    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.locale_rx.clone()
    }
}

impl Default for LocaleState {
    fn default() -> Self {
        Self::new(Locale::Source)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ru", Locale::Source)]
    #[case("EN", Locale::Target)]
    #[case(" en-US ", Locale::Target)]
    fn parses_codes(#[case] code: &str, #[case] expected: Locale) {
        assert_eq!(code.parse::<Locale>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_code() {
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn set_notifies_subscribers_once_per_change() {
        let state = LocaleState::default();
        let mut rx = state.subscribe();
        assert!(!state.set(Locale::Source));
        assert!(!rx.has_changed().unwrap_or(true));

        assert!(state.set(Locale::Target));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(*rx.borrow_and_update(), Locale::Target);
        assert_eq!(state.current(), Locale::Target);
    }

    #[test]
    fn toggle_flips_between_the_pair() {
        let state = LocaleState::new(Locale::Target);
        assert_eq!(state.toggle(), Locale::Source);
        assert_eq!(state.toggle(), Locale::Target);
    }
}
