//! Per-script configuration.
//!
//! Literary and modern Chinese lookups share every algorithm; they differ
//! only in character classes, resources, storage key and message texts.

use std::time::Duration;

use askama::{Html, MarkupDisplay};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

pub const DEFAULT_IDEOGRAPH_PATTERN: &str = r"[\x{4E00}-\x{9FCC}\x{3000}\x{3002}]";
pub const DEFAULT_PUNCTUATION_PATTERN: &str = r"[\x{3000}\x{3001}\x{3002}]";
pub const DEFAULT_LEXICON_URL: &str = "http://www.buddhism-dict.net/cgi-bin/xpr-ddb.pl";
pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_SLICE_DELAY: Duration = Duration::from_millis(5);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(180);

static LITERARY_CHINESE: Lazy<ScriptProfile> = Lazy::new(|| {
    ProfileSettings {
        name: "lzh2en".to_string(),
        resources: vec!["lzh2en-data.json".to_string()],
        storage_key: Some("lzh2en.active".to_string()),
        messages: Messages {
            loading_id: "lzh_msg_loading".to_string(),
            loading: "<p>Loading Chinese to English dictionary data, this may take some time (~1MB)</p>".to_string(),
            ready: "<p>Chinese to English lookup activated.</p>\n<p>Use the mouse or left, right arrow keys to navigate the text (shift-right to advance more).</p>\n<p>A red border indicates modern usage, possibly unrelated to early Buddhist usage.</p>".to_string(),
            ..Messages::default()
        },
        ..ProfileSettings::default()
    }
    .build()
    .expect("built-in literary profile is valid")
});

static MODERN_CHINESE: Lazy<ScriptProfile> = Lazy::new(|| {
    ProfileSettings {
        name: "zh2en".to_string(),
        resources: vec!["zh2en-data.json".to_string()],
        storage_key: None,
        messages: Messages {
            loading_id: "zh_msg_loading".to_string(),
            loading: "<p>Loading zh to en dictionary data, this may take some time (~1MB)</p>".to_string(),
            ready: "<p>Chinese to english lookup activated.</p>\n<p>Use the mouse or left, right arrow keys to navigate the text (shift-right to advance more).</p>\n<p>A red border indicates modern usage, possibly unrelated to early Buddhist usage.</p>".to_string(),
            ..Messages::default()
        },
        ..ProfileSettings::default()
    }
    .build()
    .expect("built-in modern profile is valid")
});

/// Notification texts shown while the lookup changes state.
#[derive(Debug, Clone)]
pub struct Messages {
    pub loading_id: String,
    pub loading: String,
    pub ready: String,
    /// `{}` is replaced by the failure reason.
    pub failed: String,
    pub failed_timeout: Duration,
    pub disabled: String,
    pub disabled_timeout: Duration,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            loading_id: "lookup_msg_loading".to_string(),
            loading: "<p>Loading dictionary data, this may take some time</p>".to_string(),
            ready: "<p>Lookup activated.</p>".to_string(),
            failed: "<div>Failed to download dictionary data because of <em>{}</em></div>"
                .to_string(),
            failed_timeout: Duration::from_millis(10_000),
            disabled: "<p>Lookup disabled.</p>".to_string(),
            disabled_timeout: Duration::from_millis(5_000),
        }
    }
}

impl Messages {
    /// The failure text with `reason` escaped into it.
    pub fn failure(&self, reason: &str) -> String {
        let escaped = MarkupDisplay::new_unsafe(reason, Html).to_string();
        self.failed.replacen("{}", &escaped, 1)
    }
}

/// Uncompiled profile settings; `build` validates them.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub name: String,
    pub ideograph_pattern: String,
    pub punctuation_pattern: String,
    pub resources: Vec<String>,
    pub storage_key: Option<String>,
    pub lexicon_url: String,
    pub window: usize,
    pub batch_size: usize,
    pub slice_delay: Duration,
    pub fetch_timeout: Duration,
    pub messages: Messages,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            name: "lookup".to_string(),
            ideograph_pattern: DEFAULT_IDEOGRAPH_PATTERN.to_string(),
            punctuation_pattern: DEFAULT_PUNCTUATION_PATTERN.to_string(),
            resources: Vec::new(),
            storage_key: None,
            lexicon_url: DEFAULT_LEXICON_URL.to_string(),
            window: DEFAULT_WINDOW,
            batch_size: DEFAULT_BATCH_SIZE,
            slice_delay: DEFAULT_SLICE_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            messages: Messages::default(),
        }
    }
}

impl ProfileSettings {
    pub fn build(self) -> Result<ScriptProfile, ConfigError> {
        let ideographs = Regex::new(&self.ideograph_pattern).map_err(|source| {
            ConfigError::Pattern {
                field: "ideograph",
                source,
            }
        })?;
        let punctuation = Regex::new(&self.punctuation_pattern).map_err(|source| {
            ConfigError::Pattern {
                field: "punctuation",
                source,
            }
        })?;
        if self.window == 0 {
            return Err(ConfigError::Zero { field: "window" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero {
                field: "batch_size",
            });
        }
        Ok(ScriptProfile {
            name: self.name,
            ideographs,
            punctuation,
            resources: self.resources,
            storage_key: self.storage_key,
            lexicon_url: self.lexicon_url,
            window: self.window,
            batch_size: self.batch_size,
            slice_delay: self.slice_delay,
            fetch_timeout: self.fetch_timeout,
            messages: self.messages,
        })
    }
}

/// A validated script profile.
#[derive(Debug, Clone)]
pub struct ScriptProfile {
    name: String,
    ideographs: Regex,
    punctuation: Regex,
    resources: Vec<String>,
    storage_key: Option<String>,
    lexicon_url: String,
    window: usize,
    batch_size: usize,
    slice_delay: Duration,
    fetch_timeout: Duration,
    messages: Messages,
}

impl ScriptProfile {
    /// Literary Chinese (`lzh2en`), persisted across navigation.
    pub fn literary_chinese() -> Self {
        LITERARY_CHINESE.clone()
    }

    /// Modern Chinese (`zh2en`), not persisted.
    pub fn modern_chinese() -> Self {
        MODERN_CHINESE.clone()
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "lzh" | "lzh2en" => Some(Self::literary_chinese()),
            "zh" | "zh2en" => Some(Self::modern_chinese()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the text holds at least one ideograph-class character.
    pub fn contains_ideograph(&self, text: &str) -> bool {
        self.ideographs.is_match(text)
    }

    pub fn is_ideograph(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.ideographs.is_match(ch.encode_utf8(&mut buf))
    }

    pub fn is_punctuation(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.punctuation.is_match(ch.encode_utf8(&mut buf))
    }

    /// Characters that become their own atomic unit.
    pub fn is_unit_char(&self, ch: char) -> bool {
        self.is_ideograph(ch) || self.is_punctuation(ch)
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    pub fn lexicon_url(&self) -> &str {
        &self.lexicon_url
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn slice_delay(&self) -> Duration {
        self.slice_delay
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }
}
