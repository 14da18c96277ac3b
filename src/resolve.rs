//! Longest-match resolution over a forward window of units.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::data::TableKind;
use crate::dom::{Document, NodeId};
use crate::navigate::{self, UnitFilter};
use crate::store::DictionaryStore;

/// One popup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRow {
    pub sequence: String,
    pub short_gloss: String,
    pub long_gloss: String,
    pub is_fallback: bool,
    /// External lexicon link; only primary hits carry one.
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MatchResult {
    /// Every prefix with an entry, longest first.
    pub rows: Vec<MatchRow>,
    /// Units covered by the winning (longest) match.
    #[serde(skip)]
    pub matched: Vec<NodeId>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn winner(&self) -> Option<&MatchRow> {
        self.rows.first()
    }

    /// Last unit of the winning match.
    pub fn anchor(&self) -> Option<NodeId> {
        self.matched.last().copied()
    }

    pub fn has_fallback(&self) -> bool {
        self.rows.iter().any(|row| row.is_fallback)
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    store: DictionaryStore,
    window: usize,
    lexicon_url: String,
}

impl Resolver {
    pub fn new(store: DictionaryStore, window: usize, lexicon_url: impl Into<String>) -> Self {
        Self {
            store,
            window: window.max(1),
            lexicon_url: lexicon_url.into(),
        }
    }

    /// Collects up to `window` characters of units starting at `position`,
    /// punctuation included.
    pub fn window_at(&self, doc: &Document, position: NodeId) -> (String, Vec<NodeId>) {
        let (chars, units) = self.collect_window(doc, position);
        (chars, units.into_iter().map(|(node, _)| node).collect())
    }

    /// Window text plus each unit with its character count.
    fn collect_window(&self, doc: &Document, position: NodeId) -> (String, Vec<(NodeId, usize)>) {
        let mut chars = String::new();
        let mut units = Vec::new();
        let mut count = 0;
        let mut cursor = Some(position).filter(|id| navigate::is_unit(doc, *id));
        if cursor.is_none() {
            cursor = navigate::next(doc, position, UnitFilter::Any);
        }
        while let Some(node) = cursor {
            if count >= self.window {
                break;
            }
            let text = navigate::unit_text(doc, node);
            let width = text.chars().count();
            count += width;
            chars.push_str(&text);
            units.push((node, width));
            cursor = navigate::next(doc, node, UnitFilter::Any);
        }
        (chars, units)
    }

    /// Resolves against the store's tables as they are right now.
    pub fn resolve(&self, doc: &Document, position: NodeId) -> MatchResult {
        let (window, units) = self.collect_window(doc, position);
        self.resolve_window(&window, &units)
    }

    fn resolve_window(&self, window: &str, units: &[(NodeId, usize)]) -> MatchResult {
        if window.is_empty() {
            return MatchResult::default();
        }
        let Some(tables) = self.store.tables() else {
            return MatchResult::default();
        };
        let boundaries: Vec<usize> = window
            .char_indices()
            .map(|(idx, _)| idx)
            .skip(1)
            .chain(std::iter::once(window.len()))
            .collect();

        let mut result = MatchResult::default();
        for length in (1..=boundaries.len()).rev() {
            let sequence = &window[..boundaries[length - 1]];
            let Some(hit) = tables.lookup(sequence) else {
                continue;
            };
            let is_fallback = hit.table == TableKind::Fallback;
            if result.rows.is_empty() {
                result.matched = covering(units, length);
            }
            result.rows.push(MatchRow {
                sequence: sequence.to_string(),
                href: (!is_fallback).then(|| self.lexicon_link(sequence)),
                short_gloss: hit.entry.short_gloss,
                long_gloss: hit.entry.long_gloss,
                is_fallback,
            });
        }
        result
    }

    pub fn lexicon_link(&self, sequence: &str) -> String {
        format!(
            "{}?q={}",
            self.lexicon_url,
            utf8_percent_encode(sequence, NON_ALPHANUMERIC)
        )
    }
}

/// Leading units that together hold the first `length` characters.
fn covering(units: &[(NodeId, usize)], length: usize) -> Vec<NodeId> {
    let mut covered = 0;
    units
        .iter()
        .take_while(|(_, width)| {
            let needed = covered < length;
            covered += width;
            needed
        })
        .map(|(node, _)| *node)
        .collect()
}
