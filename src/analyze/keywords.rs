//! Keyword rules (hot-reloaded from `config/frequency_words.txt`).
//!
//! Plain-text document, one word per line, groups separated by blank lines:
//!
//! ```text
//! +tesla          required: every `+` word must appear
//! earnings        normal: at least one must appear (if any are listed)
//! recall
//! !advert         filter: excludes the title from every group
//! ```
//!
//! Matching is a case-insensitive substring test. A group's display key is
//! its normal words joined by a space, or its required words if it has none.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::ConfigError;

pub const DEFAULT_KEYWORDS_PATH: &str = "config/frequency_words.txt";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordGroup {
    pub required: Vec<String>,
    pub normal: Vec<String>,
    pub group_key: String,
}

impl WordGroup {
    pub fn new(required: Vec<String>, normal: Vec<String>) -> Self {
        let group_key = if normal.is_empty() {
            required.join(" ")
        } else {
            normal.join(" ")
        };
        Self {
            required,
            normal,
            group_key,
        }
    }
}

/// Parsed keyword document: ordered groups plus the global filter words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordRules {
    pub groups: Vec<WordGroup>,
    pub filter_words: Vec<String>,
}

impl KeywordRules {
    pub fn is_catch_all(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn parse_keywords(text: &str) -> KeywordRules {
    let mut rules = KeywordRules::default();
    let mut block: Vec<&str> = Vec::new();

    // Trailing empty line flushes the last block.
    for line in text.lines().chain(std::iter::once("")) {
        let word = line.trim();
        if !word.is_empty() {
            block.push(word);
            continue;
        }
        if block.is_empty() {
            continue;
        }
        let mut required = Vec::new();
        let mut normal = Vec::new();
        for w in block.drain(..) {
            if let Some(f) = w.strip_prefix('!') {
                push_word(&mut rules.filter_words, f);
            } else if let Some(r) = w.strip_prefix('+') {
                push_word(&mut required, r);
            } else {
                normal.push(w.to_string());
            }
        }
        if !required.is_empty() || !normal.is_empty() {
            rules.groups.push(WordGroup::new(required, normal));
        }
    }
    rules
}

fn push_word(into: &mut Vec<String>, w: &str) {
    let w = w.trim();
    if !w.is_empty() {
        into.push(w.to_string());
    }
}

pub fn load_keywords_file(path: &Path) -> io::Result<KeywordRules> {
    let text = fs::read_to_string(path)?;
    Ok(parse_keywords(&text))
}

/// `FREQUENCY_WORDS_PATH`, else `config/frequency_words.txt`.
pub fn keywords_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    env::var("FREQUENCY_WORDS_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYWORDS_PATH))
}

/// Load the keyword document. A missing file is an error; an empty file
/// yields no groups (show everything).
pub fn load_keywords(explicit: Option<&Path>) -> Result<KeywordRules> {
    let path = keywords_path(explicit);
    if !path.exists() {
        return Err(ConfigError::MissingKeywords(path.display().to_string()).into());
    }
    let rules = load_keywords_file(&path)
        .with_context(|| format!("reading keyword rules {}", path.display()))?;
    tracing::info!(
        target: "config",
        path = %path.display(),
        groups = rules.groups.len(),
        filters = rules.filter_words.len(),
        "keyword rules loaded"
    );
    Ok(rules)
}

/// Hot-reload wrapper: re-reads the document when its mtime changes.
#[derive(Debug)]
pub struct HotReloadKeywords {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    rules: KeywordRules,
    last_modified: Option<SystemTime>,
}

impl HotReloadKeywords {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: keywords_path(path),
            inner: RwLock::new(State {
                rules: KeywordRules::default(),
                last_modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest rules; keeps the previous ones if the file vanished or can't be read.
    pub fn current(&self) -> KeywordRules {
        let mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        let needs_reload = match mtime {
            Some(m) => self.read_state().last_modified != Some(m),
            None => false,
        };
        if !needs_reload {
            return self.read_state().rules.clone();
        }

        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(m) = mtime {
            if guard.last_modified != Some(m) {
                match load_keywords_file(&self.path) {
                    Ok(rules) => {
                        tracing::info!(
                            target: "config",
                            path = %self.path.display(),
                            groups = rules.groups.len(),
                            "keyword rules reloaded"
                        );
                        guard.rules = rules;
                        guard.last_modified = Some(m);
                    }
                    Err(e) => {
                        tracing::warn!(target: "config", path = %self.path.display(), error = %e, "keyword reload failed");
                    }
                }
            }
        }
        guard.rules.clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}
