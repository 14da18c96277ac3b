//! Movement between atomic units in live document order.

use crate::dom::{Document, NodeId};

pub const UNIT_CLASS: &str = "lookup";
pub const PUNCTUATION_CLASS: &str = "punctuation";
pub const CURRENT_CLASS: &str = "current_lookup";
pub const FALLBACK_CLASS: &str = "fallback";

/// Which units a traversal may stop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFilter {
    Any,
    SkipPunctuation,
}

impl UnitFilter {
    fn accepts(self, doc: &Document, id: NodeId) -> bool {
        match self {
            UnitFilter::Any => is_unit(doc, id),
            UnitFilter::SkipPunctuation => is_unit(doc, id) && !is_punctuation(doc, id),
        }
    }
}

pub fn is_unit(doc: &Document, id: NodeId) -> bool {
    doc.element(id)
        .is_some_and(|element| element.name.eq_ignore_ascii_case("span") && element.has_class(UNIT_CLASS))
}

pub fn is_punctuation(doc: &Document, id: NodeId) -> bool {
    is_unit(doc, id) && doc.has_class(id, PUNCTUATION_CLASS)
}

/// Text a unit holds; one character unless the markup came pre-wrapped.
pub fn unit_text(doc: &Document, id: NodeId) -> String {
    doc.text_content(id)
}

/// First unit after `from` in document order.
pub fn next(doc: &Document, from: NodeId, filter: UnitFilter) -> Option<NodeId> {
    let mut cursor = doc.next_in_order(from);
    while let Some(node) = cursor {
        if filter.accepts(doc, node) {
            return Some(node);
        }
        cursor = doc.next_in_order(node);
    }
    None
}

/// First unit before `from` in document order.
pub fn previous(doc: &Document, from: NodeId, filter: UnitFilter) -> Option<NodeId> {
    let mut cursor = doc.previous_in_order(from);
    while let Some(node) = cursor {
        if filter.accepts(doc, node) {
            return Some(node);
        }
        cursor = doc.previous_in_order(node);
    }
    None
}

pub fn first(doc: &Document, filter: UnitFilter) -> Option<NodeId> {
    let root = doc.root();
    if filter.accepts(doc, root) {
        return Some(root);
    }
    next(doc, root, filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = concat!(
        r#"<p><span class="lookup">佛</span><span class="lookup punctuation">。</span>"#,
        r#"text <i><span class="lookup">法</span></i></p>"#,
        r#"<p><span class="lookup punctuation">、</span><span class="lookup">僧</span></p>"#,
    );

    fn units(doc: &Document, filter: UnitFilter) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = first(doc, filter);
        while let Some(node) = cursor {
            out.push(node);
            cursor = next(doc, node, filter);
        }
        out
    }

    #[test]
    fn skip_punctuation_never_stops_on_punctuation() {
        let doc = Document::parse(MARKUP).unwrap();
        let found = units(&doc, UnitFilter::SkipPunctuation);
        let text: String = found.iter().map(|id| unit_text(&doc, *id)).collect();
        assert_eq!(text, "佛法僧");
        assert!(found.iter().all(|id| !is_punctuation(&doc, *id)));
    }

    #[test]
    fn any_filter_includes_punctuation() {
        let doc = Document::parse(MARKUP).unwrap();
        let text: String = units(&doc, UnitFilter::Any)
            .iter()
            .map(|id| unit_text(&doc, *id))
            .collect();
        assert_eq!(text, "佛。法、僧");
    }

    #[test]
    fn next_and_previous_are_inverses() {
        let doc = Document::parse(MARKUP).unwrap();
        let found = units(&doc, UnitFilter::SkipPunctuation);
        for pair in found.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert_eq!(next(&doc, a, UnitFilter::SkipPunctuation), Some(b));
            assert_eq!(previous(&doc, b, UnitFilter::SkipPunctuation), Some(a));
        }
    }

    #[test]
    fn boundaries_return_none() {
        let doc = Document::parse(MARKUP).unwrap();
        let found = units(&doc, UnitFilter::SkipPunctuation);
        assert_eq!(previous(&doc, found[0], UnitFilter::SkipPunctuation), None);
        assert_eq!(
            next(&doc, *found.last().unwrap(), UnitFilter::SkipPunctuation),
            None
        );
    }

    #[test]
    fn plain_spans_are_not_units() {
        let doc = Document::parse(r#"<span class="other">佛</span>"#).unwrap();
        assert_eq!(first(&doc, UnitFilter::Any), None);
    }
}
