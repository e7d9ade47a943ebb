//! Original-value store. Each tree node owns its `OriginalRecords`, so a
//! record lives exactly as long as its position and is dropped with it.
//!
//! Per position: Untracked -> TrackedSource (first observation) ->
//! TrackedTarget (locale switched, text replaced, original kept) ->
//! TrackedSource (restored from the record). While in TrackedTarget, new
//! authentic source text at the position replaces the record (drift adoption).

use std::collections::HashMap;

use tracing::debug;

use crate::locale::Locale;
use crate::translate::{has_source_script, Catalog};

/// Which value of a node a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot<'a> {
    Text,
    Attribute(&'a str),
    DisplayValue,
}

/// Last-known source-language values for one node. Never serialized.
#[derive(Debug, Default)]
pub struct OriginalRecords {
    text: Option<String>,
    attributes: HashMap<String, String>,
    display_value: Option<String>,
}

impl OriginalRecords {
    pub fn get(&self, slot: Slot<'_>) -> Option<&str> {
        match slot {
            Slot::Text => self.text.as_deref(),
            Slot::Attribute(name) => self.attributes.get(name).map(String::as_str),
            Slot::DisplayValue => self.display_value.as_deref(),
        }
    }

    fn set(&mut self, slot: Slot<'_>, value: &str) {
        match slot {
            Slot::Text => self.text = Some(value.to_string()),
            Slot::Attribute(name) => {
                self.attributes.insert(name.to_string(), value.to_string());
            }
            Slot::DisplayValue => self.display_value = Some(value.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.attributes.is_empty() && self.display_value.is_none()
    }
}

/// How a resolution treated the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First observation; the current value became the record.
    Captured,
    /// Source locale, authentic edit; record follows the current value.
    Refreshed,
    /// Record returned as is.
    Cached,
    /// Target locale, new source text replaced the record.
    Adopted,
}

/// What kind of pass is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Whole-root pass after a locale change (or at install). Values equal
    /// to the record's translation are the engine's own earlier writes.
    Full,
    /// Work derived from mutation records; any change is the app's own.
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The source-language value that belongs at the position.
    pub original: String,
    pub outcome: Outcome,
}

/// Decide the source-language value for a position currently showing `current`.
pub fn resolve_original(
    records: &mut OriginalRecords,
    slot: Slot<'_>,
    current: &str,
    locale: Locale,
    pass: Pass,
    catalog: &Catalog,
) -> Resolution {
    let Some(record) = records.get(slot).map(str::to_string) else {
        records.set(slot, current);
        return Resolution {
            original: current.to_string(),
            outcome: Outcome::Captured,
        };
    };

    if record == current {
        return Resolution {
            original: current.to_string(),
            outcome: Outcome::Cached,
        };
    }

    let expected = catalog.translate(&record, Locale::Target);
    match locale {
        // Switching back: our own earlier write, restore the record.
        Locale::Source if pass == Pass::Full && current == expected => Resolution {
            original: record,
            outcome: Outcome::Cached,
        },
        Locale::Source => {
            records.set(slot, current);
            Resolution {
                original: current.to_string(),
                outcome: Outcome::Refreshed,
            }
        }
        Locale::Target if has_source_script(current) && current != expected => {
            debug!(?slot, previous = %record, adopted = %current, "drift adopted");
            records.set(slot, current);
            Resolution {
                original: current.to_string(),
                outcome: Outcome::Adopted,
            }
        }
        Locale::Target => Resolution {
            original: record,
            outcome: Outcome::Cached,
        },
    }
}
