//! Perevod: runtime UI translation for a mutating element tree.
//!
//! Text positions, translatable attributes and button labels under an
//! application root are swapped between the source (Russian) and target
//! (English) locale from a static catalog, and kept translated as the
//! tree keeps changing.

pub mod config;
pub mod dialog;
pub mod engine;
pub mod locale;
pub mod store;
pub mod translate;
pub mod translator;
pub mod tree;
pub mod watcher;

use once_cell::sync::Lazy;

pub use config::{ConfigError, EngineConfig};
pub use dialog::{Dialogs, PromptHost};
pub use engine::{spawn_frame_loop, Engine, InstallOutcome};
pub use locale::{Locale, LocaleState};
pub use translate::{Catalog, CatalogError, DictionaryEntry, PatternRule};
pub use translator::{PassStats, Translator};
pub use tree::{MutationRecord, NodeId, TreeError, UiTree};
pub use watcher::{MutationWatcher, TickReport};

static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog::builtin(&EngineConfig::default()));

/// One-off translation of `value` with the built-in catalog. Never touches
/// a tree; under the source locale the value comes back unchanged.
pub fn translate_runtime_text(value: &str, locale: Locale) -> String {
    BUILTIN.translate(value, locale)
}

/// The catalog behind [`translate_runtime_text`].
pub fn builtin_catalog() -> &'static Catalog {
    &BUILTIN
}

/// Install the global `tracing` subscriber, writing to stderr so stdout
/// stays clean for translated output. `RUST_LOG` overrides the default
/// `perevod=info` filter. A second call is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("perevod=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_text_uses_builtin_catalog() {
        assert_eq!(translate_runtime_text("Войти", Locale::Target), "Log in");
        assert_eq!(translate_runtime_text("Войти", Locale::Source), "Войти");
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
