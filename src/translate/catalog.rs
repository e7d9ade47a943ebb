//! Translation catalog loading and resolution.
//! Resolution order is fixed: exact entry, then pattern rules in declared
//! order, then longest-first partial substitution, then the input unchanged.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{has_source_script, split_padding, CompiledRule, DictionaryEntry, PatternRule};
use crate::config::EngineConfig;
use crate::locale::Locale;

const BUILTIN_CATALOG: &str = include_str!("../../catalog/default.json");

/// On-disk catalog file format.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    entries: Vec<DictionaryEntry>,
    #[serde(default)]
    patterns: Vec<PatternRule>,
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "catalog IO error: {e}"),
            CatalogError::Parse(e) => write!(f, "catalog parse error: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Parse(e)
    }
}

/// Immutable dictionary + rules, with a memo of target-locale results.
pub struct Catalog {
    version: u32,
    exact: HashMap<String, String>,
    rules: Vec<CompiledRule>,
    /// Sorted by descending source length (chars); ties keep declaration order.
    partial: Vec<DictionaryEntry>,
    skipped_rules: Vec<(PatternRule, String)>,
    memo: Option<Mutex<LruCache<String, String>>>,
}

impl Catalog {
    /// Build with default engine options.
    pub fn new(entries: Vec<DictionaryEntry>, patterns: Vec<PatternRule>) -> Self {
        Self::from_parts(0, entries, patterns, &EngineConfig::default())
    }

    pub fn from_parts(
        version: u32,
        entries: Vec<DictionaryEntry>,
        patterns: Vec<PatternRule>,
        config: &EngineConfig,
    ) -> Self {
        let mut exact = HashMap::with_capacity(entries.len());
        for entry in &entries {
            if exact.contains_key(&entry.source) {
                debug!(source = %entry.source, "duplicate catalog entry ignored");
                continue;
            }
            exact.insert(entry.source.clone(), entry.target.clone());
        }

        let mut rules = Vec::with_capacity(patterns.len());
        let mut skipped_rules = Vec::new();
        for rule in patterns {
            match CompiledRule::compile(&rule) {
                Ok(compiled) => rules.push(compiled),
                Err(e) => {
                    warn!(pattern = %rule.pattern, error = %e, "malformed pattern rule skipped");
                    skipped_rules.push((rule, e.to_string()));
                }
            }
        }

        let mut seen = HashSet::new();
        let mut partial: Vec<DictionaryEntry> = entries
            .into_iter()
            .filter(|e| e.source.chars().count() > config.partial_min_chars)
            .filter(|e| seen.insert(e.source.clone()))
            .collect();
        partial.sort_by_key(|e| std::cmp::Reverse(e.source.chars().count()));

        let memo =
            NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));

        Self {
            version,
            exact,
            rules,
            partial,
            skipped_rules,
            memo,
        }
    }

    /// Load a catalog from a JSON file.
    pub fn load_from_file(path: &Path, config: &EngineConfig) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content, config)?;
        info!(path = %path.display(), "catalog file loaded");
        Ok(catalog)
    }

    pub fn from_json(content: &str, config: &EngineConfig) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let catalog = Self::from_parts(file.version, file.entries, file.patterns, config);
        info!(
            version = catalog.version,
            entries = catalog.exact.len(),
            rules = catalog.rules.len(),
            skipped = catalog.skipped_rules.len(),
            "catalog_ready"
        );
        Ok(catalog)
    }

    /// The catalog compiled into the binary (social-network UI copy).
    pub fn builtin(config: &EngineConfig) -> Self {
        Self::from_json(BUILTIN_CATALOG, config).unwrap_or_else(|e| {
            warn!(error = %e, "built-in catalog unreadable, using empty");
            Self::empty()
        })
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rules dropped at build time, with the reason.
    pub fn skipped_rules(&self) -> &[(PatternRule, String)] {
        &self.skipped_rules
    }

    /// Text to display for `text` under `locale`. Never fails: a miss
    /// returns the input as is.
    pub fn translate(&self, text: &str, locale: Locale) -> String {
        if locale != Locale::Target || !has_source_script(text) {
            return text.to_string();
        }
        if let Some(memo) = &self.memo {
            if let Some(hit) = memo.lock().get(text) {
                return hit.clone();
            }
        }

        let resolved = self.resolve(text);
        if let Some(memo) = &self.memo {
            memo.lock().put(text.to_string(), resolved.clone());
        }
        resolved
    }

    fn resolve(&self, text: &str) -> String {
        let (lead, core, trail) = split_padding(text);

        if let Some(target) = self.exact.get(core) {
            return format!("{lead}{target}{trail}");
        }
        if let Some(out) = self.rules.iter().find_map(|rule| rule.apply(core)) {
            return format!("{lead}{out}{trail}");
        }
        if let Some(out) = self.substitute_partials(core) {
            return format!("{lead}{out}{trail}");
        }
        text.to_string()
    }

    /// Longest-first in-place replacement of known phrases.
    fn substitute_partials(&self, text: &str) -> Option<String> {
        let mut out = text.to_string();
        let mut replaced = false;
        for entry in &self.partial {
            if out.contains(entry.source.as_str()) {
                out = out.replace(entry.source.as_str(), &entry.target);
                replaced = true;
            }
        }
        replaced.then_some(out)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("version", &self.version)
            .field("entries", &self.exact.len())
            .field("rules", &self.rules.len())
            .field("partial", &self.partial.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                DictionaryEntry::new("Войти", "Log in"),
                DictionaryEntry::new("Привет", "Hello"),
                DictionaryEntry::new("1 комментарий", "1 comment"),
                DictionaryEntry::new("Добро пожаловать", "Welcome"),
                DictionaryEntry::new("пожаловать", "come"),
                DictionaryEntry::new("Лента", "Feed"),
                DictionaryEntry::new("да", "yes"),
            ],
            vec![
                PatternRule::new(r"^(\d+) комментари(?:й|я|ев)$", "$1 comments"),
                PatternRule::new(r"^Привет, (.+)!$", "Hello, $1!"),
            ],
        )
    }

    #[rstest]
    fn exact_entry(catalog: Catalog) {
        assert_eq!(catalog.translate("Войти", Locale::Target), "Log in");
    }

    #[rstest]
    fn source_locale_is_identity(catalog: Catalog) {
        assert_eq!(catalog.translate("Войти", Locale::Source), "Войти");
    }

    #[rstest]
    fn text_without_source_script_is_untouched(catalog: Catalog) {
        assert_eq!(catalog.translate("Hello world", Locale::Target), "Hello world");
    }

    #[rstest]
    fn exact_beats_pattern(catalog: Catalog) {
        assert_eq!(catalog.translate("1 комментарий", Locale::Target), "1 comment");
        assert_eq!(catalog.translate("5 комментариев", Locale::Target), "5 comments");
    }

    #[rstest]
    fn pattern_rules_run_in_declared_order() {
        let catalog = Catalog::new(
            Vec::new(),
            vec![
                PatternRule::new(r"^Привет, (.+)!$", "Hi $1"),
                PatternRule::new(r"^Привет, (.+)$", "Hello $1"),
            ],
        );
        assert_eq!(catalog.translate("Привет, Оля!", Locale::Target), "Hi Оля");
    }

    #[rstest]
    fn partial_prefers_longest_phrase(catalog: Catalog) {
        assert_eq!(
            catalog.translate("Добро пожаловать, гость", Locale::Target),
            "Welcome, гость"
        );
    }

    #[rstest]
    fn partial_skips_short_entries(catalog: Catalog) {
        assert_eq!(catalog.translate("когда да", Locale::Target), "когда да");
    }

    #[rstest]
    fn whitespace_padding_is_preserved(catalog: Catalog) {
        assert_eq!(catalog.translate("\n  Лента  ", Locale::Target), "\n  Feed  ");
    }

    #[rstest]
    fn coverage_miss_returns_input(catalog: Catalog) {
        assert_eq!(catalog.translate("Неизвестно", Locale::Target), "Неизвестно");
    }

    #[rstest]
    fn translation_is_idempotent(catalog: Catalog) {
        for text in ["Войти", "5 комментариев", "Привет, Оля!", "Добро пожаловать, гость"] {
            let once = catalog.translate(text, Locale::Target);
            assert_eq!(catalog.translate(&once, Locale::Target), once, "{text}");
        }
    }

    #[test]
    fn malformed_rules_are_skipped_not_fatal() {
        let catalog = Catalog::new(
            vec![DictionaryEntry::new("Войти", "Log in")],
            vec![
                PatternRule::new(r"^(\d+ лайк", "$1 likes"),
                PatternRule::new(r"^(\d+) лайков$", "$1 likes"),
            ],
        );
        assert_eq!(catalog.rule_count(), 1);
        assert_eq!(catalog.skipped_rules().len(), 1);
        assert_eq!(catalog.translate("7 лайков", Locale::Target), "7 likes");
    }

    #[test]
    fn memo_disabled_with_zero_capacity() {
        let config = EngineConfig {
            cache_capacity: 0,
            ..EngineConfig::default()
        };
        let catalog = Catalog::from_parts(
            1,
            vec![DictionaryEntry::new("Войти", "Log in")],
            Vec::new(),
            &config,
        );
        assert_eq!(catalog.translate("Войти", Locale::Target), "Log in");
        assert_eq!(catalog.translate("Войти", Locale::Target), "Log in");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": 3, "entries": [{{"source": "Чат", "target": "Chat"}}]}}"#
        )
        .unwrap();
        let catalog = Catalog::load_from_file(file.path(), &EngineConfig::default()).unwrap();
        assert_eq!(catalog.version(), 3);
        assert_eq!(catalog.translate("Чат", Locale::Target), "Chat");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = Path::new("/nonexistent/catalog.json");
        let err = Catalog::load_from_file(path, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = Catalog::builtin(&EngineConfig::default());
        assert!(!catalog.is_empty());
        assert!(catalog.skipped_rules().is_empty());
        assert_eq!(catalog.translate("Войти", Locale::Target), "Log in");
    }
}
