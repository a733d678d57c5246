//! Tag registry: global defaults plus per-tag overrides.
//!
//! Each tag may override the level, the sink list, both, or neither. A
//! missing field is read from the global default at resolve time, so tags
//! that inherit see later changes to the globals.
//!
//! # Discipline
//!
//! The registry has no interior locking. Configure it from one owning
//! context (at startup, or rarely); every mutation takes `&mut self`, so the
//! borrow checker rejects concurrent mutation while a dispatch is running.

use std::collections::HashMap;

use crate::level::{Level, ParseLevelError};
use crate::sink::BoxedSink;

/// Global level used until configured, and restored by `clear_global_level`.
pub const DEFAULT_LEVEL: Level = Level::All;

/// Per-tag overrides. Never stored with both fields empty.
#[derive(Default)]
struct TagConfig {
    level: Option<Level>,
    sinks: Option<Vec<BoxedSink>>,
}

impl TagConfig {
    #[inline]
    fn is_empty(&self) -> bool {
        self.level.is_none() && self.sinks.is_none()
    }
}

/// Level and sinks actually applied to a tag.
pub struct EffectiveConfig<'a> {
    pub level: Level,
    pub sinks: &'a [BoxedSink],
    /// Level comes from the global default.
    pub level_inherited: bool,
    /// Sinks come from the global list.
    pub sinks_inherited: bool,
}

impl EffectiveConfig<'_> {
    /// True if a record at `level` would be dispatched.
    #[inline]
    pub fn should_log(&self, level: Level) -> bool {
        self.level.allows(level)
    }
}

/// Invalid configuration directive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("empty tag in directive `{0}`")]
    EmptyTag(String),
    #[error(transparent)]
    Level(#[from] ParseLevelError),
}

/// Process-wide logger configuration.
pub struct Registry {
    global_level: Level,
    global_sinks: Vec<BoxedSink>,
    tags: HashMap<String, TagConfig>,
}

impl Registry {
    /// Create an empty registry (level `All`, no sinks, no tags).
    pub fn new() -> Self {
        Self {
            global_level: DEFAULT_LEVEL,
            global_sinks: Vec::new(),
            tags: HashMap::new(),
        }
    }

    /// Effective configuration for `tag`. Never fails.
    pub fn resolve(&self, tag: &str) -> EffectiveConfig<'_> {
        let entry = self.tags.get(tag);
        let level = entry.and_then(|t| t.level);
        let sinks = entry.and_then(|t| t.sinks.as_deref());

        EffectiveConfig {
            level: level.unwrap_or(self.global_level),
            sinks: sinks.unwrap_or(self.global_sinks.as_slice()),
            level_inherited: level.is_none(),
            sinks_inherited: sinks.is_none(),
        }
    }

    /// Effective level and mutable sink list for `tag` (dispatch path).
    pub fn resolve_mut(&mut self, tag: &str) -> (Level, &mut [BoxedSink]) {
        match self.tags.get_mut(tag) {
            Some(entry) => {
                let level = entry.level.unwrap_or(self.global_level);
                let sinks: &mut [BoxedSink] = match entry.sinks.as_deref_mut() {
                    Some(sinks) => sinks,
                    None => self.global_sinks.as_mut_slice(),
                };
                (level, sinks)
            }
            None => (self.global_level, self.global_sinks.as_mut_slice()),
        }
    }

    /// Effective level for `tag`.
    #[inline]
    pub fn level(&self, tag: &str) -> Level {
        self.tags
            .get(tag)
            .and_then(|t| t.level)
            .unwrap_or(self.global_level)
    }

    /// Override the level of `tag`.
    pub fn set_level(&mut self, tag: &str, level: Level) {
        self.entry(tag).level = Some(level);
    }

    /// Drop the level override of `tag`; no-op for unknown tags.
    pub fn clear_level(&mut self, tag: &str) {
        if let Some(entry) = self.tags.get_mut(tag) {
            entry.level = None;
        }
        self.collect(tag);
    }

    /// Append `sink` to the sink override of `tag`, creating the override
    /// (initially empty, not a copy of the globals) if needed.
    pub fn add_sink(&mut self, tag: &str, sink: BoxedSink) {
        self.entry(tag).sinks.get_or_insert_with(Vec::new).push(sink);
    }

    /// Replace the sink override of `tag`.
    ///
    /// An empty list is a valid override: the tag logs nowhere.
    pub fn set_sinks(&mut self, tag: &str, sinks: Vec<BoxedSink>) {
        self.entry(tag).sinks = Some(sinks);
    }

    /// Drop the sink override of `tag` (its sinks are dropped too).
    pub fn clear_sinks(&mut self, tag: &str) {
        if let Some(entry) = self.tags.get_mut(tag) {
            entry.sinks = None;
        }
        self.collect(tag);
    }

    /// Global default level.
    #[inline]
    pub fn global_level(&self) -> Level {
        self.global_level
    }

    /// Set the global default level.
    pub fn set_global_level(&mut self, level: Level) {
        self.global_level = level;
    }

    /// Reset the global level to [`DEFAULT_LEVEL`].
    pub fn clear_global_level(&mut self) {
        self.global_level = DEFAULT_LEVEL;
    }

    /// Append a sink to the global list.
    pub fn add_global_sink(&mut self, sink: BoxedSink) {
        self.global_sinks.push(sink);
    }

    /// Remove (and drop) every global sink.
    pub fn clear_global_sinks(&mut self) {
        self.global_sinks.clear();
    }

    /// Global sink list.
    pub fn global_sinks(&self) -> &[BoxedSink] {
        &self.global_sinks
    }

    /// True if `tag` has at least one override.
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Number of tags with overrides.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Tags with overrides, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Apply a comma separated directive list, e.g. `"warning,NET=debug"`.
    ///
    /// A bare level sets the global level; `TAG=level` sets a tag override.
    /// Stops at the first bad item; items before it stay applied.
    pub fn apply_directives(&mut self, directives: &str) -> Result<(), DirectiveError> {
        for item in directives.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((tag, level)) => {
                    let tag = tag.trim();
                    if tag.is_empty() {
                        return Err(DirectiveError::EmptyTag(item.to_string()));
                    }
                    self.set_level(tag, level.parse()?);
                }
                None => self.set_global_level(item.parse()?),
            }
        }
        Ok(())
    }

    fn entry(&mut self, tag: &str) -> &mut TagConfig {
        self.tags.entry(tag.to_string()).or_default()
    }

    /// Remove `tag` if it no longer overrides anything.
    fn collect(&mut self, tag: &str) {
        if self.tags.get(tag).is_some_and(TagConfig::is_empty) {
            self.tags.remove(tag);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
