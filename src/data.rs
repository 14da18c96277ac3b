use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use fst::automaton::Str;
use fst::{Automaton, IntoStreamer, Map, MapBuilder, Streamer};
use serde::{Deserialize, Serialize};
use tracing::warn;
use zstd::stream::decode_all;

use crate::error::DictionaryLoadError;

/// Word joiners are layout hints in the source texts, never part of a key.
const WORD_JOINER: char = '\u{2060}';

/// A gloss pair for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct DictionaryEntry {
    pub short_gloss: String,
    pub long_gloss: String,
}

impl DictionaryEntry {
    pub fn new(short_gloss: impl Into<String>, long_gloss: impl Into<String>) -> Self {
        Self {
            short_gloss: short_gloss.into(),
            long_gloss: long_gloss.into(),
        }
    }
}

impl From<(String, String)> for DictionaryEntry {
    fn from((short_gloss, long_gloss): (String, String)) -> Self {
        Self {
            short_gloss,
            long_gloss,
        }
    }
}

impl From<DictionaryEntry> for (String, String) {
    fn from(entry: DictionaryEntry) -> Self {
        (entry.short_gloss, entry.long_gloss)
    }
}

/// Which table answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub entry: DictionaryEntry,
    pub table: TableKind,
}

/// On-the-wire shape of one dictionary resource.
#[derive(Debug, Default, Deserialize)]
struct ResourceFile {
    #[serde(default)]
    primary: HashMap<String, DictionaryEntry>,
    #[serde(default)]
    fallback: HashMap<String, DictionaryEntry>,
}

/// Decodes one fetched resource, decompressing `.zst` payloads first.
pub(crate) fn decode_resource(
    resource: &str,
    bytes: &[u8],
) -> Result<(HashMap<String, DictionaryEntry>, HashMap<String, DictionaryEntry>), DictionaryLoadError>
{
    let parsed: ResourceFile = if resource.ends_with(".zst") {
        let raw = decode_all(Cursor::new(bytes)).map_err(|source| {
            DictionaryLoadError::Decompress {
                resource: resource.to_string(),
                source,
            }
        })?;
        serde_json::from_slice(&raw)
    } else {
        serde_json::from_slice(bytes)
    }
    .map_err(|source| DictionaryLoadError::Parse {
        resource: resource.to_string(),
        source,
    })?;
    Ok((parsed.primary, parsed.fallback))
}

/// Accumulates resources; later keys override earlier ones.
#[derive(Debug, Default)]
pub struct TablesBuilder {
    primary: BTreeMap<String, DictionaryEntry>,
    fallback: HashMap<char, DictionaryEntry>,
}

impl TablesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(mut self, key: &str, entry: DictionaryEntry) -> Self {
        self.insert_primary(key, entry);
        self
    }

    pub fn fallback(mut self, key: char, entry: DictionaryEntry) -> Self {
        self.fallback.insert(key, entry);
        self
    }

    pub fn insert_primary(&mut self, key: &str, entry: DictionaryEntry) {
        let key = normalize(key);
        if key.is_empty() {
            return;
        }
        self.primary.insert(key, entry);
    }

    pub fn insert_fallback(&mut self, key: &str, entry: DictionaryEntry) {
        let key = normalize(key);
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                self.fallback.insert(ch, entry);
            }
            _ => warn!(key = %key, "skipping fallback entry that is not a single character"),
        }
    }

    pub(crate) fn merge(
        &mut self,
        primary: HashMap<String, DictionaryEntry>,
        fallback: HashMap<String, DictionaryEntry>,
    ) {
        for (key, entry) in primary {
            self.insert_primary(&key, entry);
        }
        for (key, entry) in fallback {
            self.insert_fallback(&key, entry);
        }
    }

    pub fn finish(self) -> Result<DictionaryTables, DictionaryLoadError> {
        let mut builder = MapBuilder::memory();
        let mut entries = Vec::with_capacity(self.primary.len());
        // BTreeMap iteration is already in the byte order fst requires.
        for (idx, (key, entry)) in self.primary.into_iter().enumerate() {
            builder.insert(key.as_bytes(), idx as u64)?;
            entries.push(entry);
        }
        let index = Map::new(builder.into_inner()?)?;
        Ok(DictionaryTables {
            index,
            entries,
            fallback: self.fallback,
        })
    }
}

/// Immutable, fully loaded primary and fallback tables.
pub struct DictionaryTables {
    index: Map<Vec<u8>>,
    entries: Vec<DictionaryEntry>,
    fallback: HashMap<char, DictionaryEntry>,
}

impl std::fmt::Debug for DictionaryTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryTables")
            .field("primary", &self.entries.len())
            .field("fallback", &self.fallback.len())
            .finish()
    }
}

impl DictionaryTables {
    pub fn primary_len(&self) -> usize {
        self.entries.len()
    }

    pub fn fallback_len(&self) -> usize {
        self.fallback.len()
    }

    /// Exact primary-table entry.
    pub fn primary(&self, sequence: &str) -> Option<&DictionaryEntry> {
        let key = normalize(sequence);
        self.index
            .get(key.as_bytes())
            .and_then(|idx| self.entries.get(idx as usize))
    }

    /// Fallback entry; only ever answers single characters.
    pub fn fallback(&self, sequence: &str) -> Option<&DictionaryEntry> {
        let key = normalize(sequence);
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => self.fallback.get(&ch),
            _ => None,
        }
    }

    /// Primary table first, then the fallback table for single characters.
    pub fn lookup(&self, sequence: &str) -> Option<Hit> {
        if let Some(entry) = self.primary(sequence) {
            return Some(Hit {
                entry: entry.clone(),
                table: TableKind::Primary,
            });
        }
        self.fallback(sequence).map(|entry| Hit {
            entry: entry.clone(),
            table: TableKind::Fallback,
        })
    }

    /// Returns up to `limit` primary keys that start with the provided prefix.
    pub fn prefix(&self, prefix: &str, limit: usize) -> Vec<(String, DictionaryEntry)> {
        let prefix = normalize(prefix);
        let automaton = Str::new(&prefix).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut results = Vec::new();
        while let Some((key, value)) = stream.next() {
            if results.len() >= limit {
                break;
            }
            let Ok(word) = std::str::from_utf8(key) else {
                continue;
            };
            if let Some(entry) = self.entries.get(value as usize) {
                results.push((word.to_string(), entry.clone()));
            }
        }
        results
    }
}

fn normalize(sequence: &str) -> String {
    sequence.chars().filter(|ch| *ch != WORD_JOINER).collect()
}
