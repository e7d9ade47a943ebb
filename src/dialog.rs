//! Dialog patcher: routes the message of blocking prompts (alert, confirm,
//! prompt) through the catalog. The prompt's default value is user data and
//! passes through untouched.

use std::sync::Arc;

use tracing::info;

use crate::locale::LocaleState;
use crate::translate::Catalog;

/// The host's three blocking prompt primitives.
pub trait PromptHost: Send {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
    fn prompt(&self, message: &str, default: Option<&str>) -> Option<String>;
}

/// Placeholder used only while the real host is being swapped.
struct Detached;

impl PromptHost for Detached {
    fn alert(&self, _message: &str) {}

    fn confirm(&self, _message: &str) -> bool {
        false
    }

    fn prompt(&self, _message: &str, _default: Option<&str>) -> Option<String> {
        None
    }
}

/// Wraps the host's original prompts and translates their messages.
struct TranslatingPrompts {
    original: Box<dyn PromptHost>,
    catalog: Arc<Catalog>,
    locale: Arc<LocaleState>,
}

impl TranslatingPrompts {
    fn message(&self, message: &str) -> String {
        self.catalog.translate(message, self.locale.current())
    }
}

impl PromptHost for TranslatingPrompts {
    fn alert(&self, message: &str) {
        self.original.alert(&self.message(message));
    }

    fn confirm(&self, message: &str) -> bool {
        self.original.confirm(&self.message(message))
    }

    fn prompt(&self, message: &str, default: Option<&str>) -> Option<String> {
        self.original.prompt(&self.message(message), default)
    }
}

/// The application's prompt entry points.
pub struct Dialogs {
    host: Box<dyn PromptHost>,
    patched: bool,
}

impl Dialogs {
    pub fn new(host: Box<dyn PromptHost>) -> Self {
        Self {
            host,
            patched: false,
        }
    }

    pub fn is_patched(&self) -> bool {
        self.patched
    }

    /// Wrap the current host so messages are translated. Installs at most
    /// once; returns false if already patched.
    pub fn patch(&mut self, catalog: Arc<Catalog>, locale: Arc<LocaleState>) -> bool {
        if self.patched {
            return false;
        }
        let original = std::mem::replace(&mut self.host, Box::new(Detached));
        self.host = Box::new(TranslatingPrompts {
            original,
            catalog,
            locale,
        });
        self.patched = true;
        info!("dialog prompts patched");
        true
    }

    pub fn alert(&self, message: &str) {
        self.host.alert(message);
    }

    pub fn confirm(&self, message: &str) -> bool {
        self.host.confirm(message)
    }

    pub fn prompt(&self, message: &str, default: Option<&str>) -> Option<String> {
        self.host.prompt(message, default)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::locale::Locale;
    use crate::translate::DictionaryEntry;

    /// Records every call it receives.
    #[derive(Clone, Default)]
    struct RecordingHost {
        calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl PromptHost for RecordingHost {
        fn alert(&self, message: &str) {
            self.calls.lock().push((message.to_string(), None));
        }

        fn confirm(&self, message: &str) -> bool {
            self.calls.lock().push((message.to_string(), None));
            true
        }

        fn prompt(&self, message: &str, default: Option<&str>) -> Option<String> {
            self.calls
                .lock()
                .push((message.to_string(), default.map(str::to_string)));
            default.map(str::to_string)
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(
            vec![
                DictionaryEntry::new("Удалить пост?", "Delete post?"),
                DictionaryEntry::new("Введите имя", "Enter a name"),
                DictionaryEntry::new("Гость", "Guest"),
            ],
            Vec::new(),
        ))
    }

    #[test]
    fn messages_follow_the_locale() {
        let host = RecordingHost::default();
        let locale = Arc::new(LocaleState::new(Locale::Target));
        let mut dialogs = Dialogs::new(Box::new(host.clone()));
        assert!(dialogs.patch(catalog(), Arc::clone(&locale)));

        assert!(dialogs.confirm("Удалить пост?"));
        locale.set(Locale::Source);
        dialogs.alert("Удалить пост?");

        let calls = host.calls.lock();
        assert_eq!(calls[0].0, "Delete post?");
        assert_eq!(calls[1].0, "Удалить пост?");
    }

    #[test]
    fn prompt_default_is_left_alone() {
        let host = RecordingHost::default();
        let locale = Arc::new(LocaleState::new(Locale::Target));
        let mut dialogs = Dialogs::new(Box::new(host.clone()));
        dialogs.patch(catalog(), locale);

        let answer = dialogs.prompt("Введите имя", Some("Гость"));
        assert_eq!(answer.as_deref(), Some("Гость"));
        assert_eq!(
            host.calls.lock()[0],
            ("Enter a name".to_string(), Some("Гость".to_string()))
        );
    }

    #[test]
    fn patching_twice_does_not_double_wrap() {
        let host = RecordingHost::default();
        let locale = Arc::new(LocaleState::new(Locale::Target));
        let mut dialogs = Dialogs::new(Box::new(host.clone()));
        assert!(dialogs.patch(catalog(), Arc::clone(&locale)));
        assert!(!dialogs.patch(catalog(), locale));
        assert!(dialogs.is_patched());
        dialogs.alert("Гость");
        assert_eq!(host.calls.lock().len(), 1);
    }
}
