//! Incremental rewriting of ideograph runs into atomic unit spans.
//!
//! Work is cut into slices of `batch_size` text nodes. The cursor always
//! holds the next text node to visit, computed before the current node is
//! rewritten, so freshly inserted spans are never revisited.

use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::navigate::{PUNCTUATION_CLASS, UNIT_CLASS, is_unit};
use crate::profile::ScriptProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentStats {
    pub text_nodes_visited: usize,
    pub text_nodes_wrapped: usize,
    pub units_created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentProgress {
    /// More slices are needed.
    Pending,
    Complete(SegmentStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Idle,
    Running(Option<NodeId>),
    Complete,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    batch_size: usize,
    cursor: Cursor,
    stats: SegmentStats,
}

impl Segmenter {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cursor: Cursor::Idle,
            stats: SegmentStats::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.cursor, Cursor::Running(_))
    }

    pub fn stats(&self) -> SegmentStats {
        self.stats
    }

    /// Positions the cursor at the first text node.
    ///
    /// Returns false, without touching the cursor, when a pass is already
    /// running or has finished on this document.
    pub fn start(&mut self, doc: &Document) -> bool {
        match self.cursor {
            Cursor::Running(_) => {
                debug!("segmentation already running; ignoring start");
                false
            }
            Cursor::Complete => {
                debug!("document already segmented; ignoring start");
                false
            }
            Cursor::Idle => {
                let root = doc.root();
                self.cursor = Cursor::Running(doc.next_text_node(root));
                self.stats = SegmentStats::default();
                true
            }
        }
    }

    /// Forgets all progress; used once the document has been restored.
    pub fn reset(&mut self) {
        self.cursor = Cursor::Idle;
        self.stats = SegmentStats::default();
    }

    /// Processes one slice of at most `batch_size` text nodes.
    pub fn step(&mut self, doc: &mut Document, profile: &ScriptProfile) -> SegmentProgress {
        let mut node = match self.cursor {
            Cursor::Running(node) => node,
            Cursor::Complete => return SegmentProgress::Complete(self.stats),
            Cursor::Idle => return SegmentProgress::Pending,
        };
        for _ in 0..self.batch_size {
            let Some(current) = node else {
                break;
            };
            let next = doc.next_text_node(current);
            self.stats.text_nodes_visited += 1;
            let created = wrap_text_node(doc, current, profile);
            if created > 0 {
                self.stats.text_nodes_wrapped += 1;
                self.stats.units_created += created;
            }
            node = next;
        }
        if node.is_none() {
            self.cursor = Cursor::Complete;
            debug!(
                visited = self.stats.text_nodes_visited,
                wrapped = self.stats.text_nodes_wrapped,
                units = self.stats.units_created,
                "segmentation complete"
            );
            SegmentProgress::Complete(self.stats)
        } else {
            self.cursor = Cursor::Running(node);
            SegmentProgress::Pending
        }
    }

    /// Runs slices until the whole document is processed.
    pub fn run_to_completion(&mut self, doc: &mut Document, profile: &ScriptProfile) -> SegmentStats {
        self.start(doc);
        loop {
            match self.step(doc, profile) {
                SegmentProgress::Complete(stats) => return stats,
                SegmentProgress::Pending if !self.is_running() => return self.stats,
                SegmentProgress::Pending => {}
            }
        }
    }
}

/// Splits one text node into plain text and unit spans.
///
/// Returns the number of units created; zero leaves the node untouched.
fn wrap_text_node(doc: &mut Document, node: NodeId, profile: &ScriptProfile) -> usize {
    if doc.parent(node).is_some_and(|parent| is_unit(doc, parent)) {
        return 0;
    }
    let Some(text) = doc.text(node) else {
        return 0;
    };
    if !profile.contains_ideograph(text) {
        return 0;
    }
    let text = text.to_string();

    let mut replacements = Vec::new();
    let mut plain = String::new();
    let mut units = 0;
    for ch in text.chars() {
        if !profile.is_unit_char(ch) {
            plain.push(ch);
            continue;
        }
        if !plain.is_empty() {
            replacements.push(doc.create_text(&plain));
            plain.clear();
        }
        let class = if profile.is_punctuation(ch) {
            format!("{UNIT_CLASS} {PUNCTUATION_CLASS}")
        } else {
            UNIT_CLASS.to_string()
        };
        let span = doc.create_element("span", vec![("class".to_string(), class)]);
        let mut buf = [0u8; 4];
        let inner = doc.create_text(ch.encode_utf8(&mut buf));
        doc.append_child(span, inner);
        replacements.push(span);
        units += 1;
    }
    if !plain.is_empty() {
        replacements.push(doc.create_text(&plain));
    }
    doc.replace_with(node, &replacements);
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigate::{UnitFilter, first, next, unit_text};

    fn segment(html: &str) -> (Document, SegmentStats) {
        let profile = ScriptProfile::literary_chinese();
        let mut doc = Document::parse(html).unwrap();
        let stats = Segmenter::new(10).run_to_completion(&mut doc, &profile);
        (doc, stats)
    }

    #[test]
    fn wraps_each_ideograph_and_punctuation() {
        let (doc, stats) = segment("<p>如是我聞、一時 Buddha。</p>");
        assert_eq!(
            doc.serialize(),
            concat!(
                "<p>",
                r#"<span class="lookup">如</span><span class="lookup">是</span>"#,
                r#"<span class="lookup">我</span><span class="lookup">聞</span>"#,
                r#"<span class="lookup punctuation">、</span>"#,
                r#"<span class="lookup">一</span><span class="lookup">時</span>"#,
                " Buddha",
                r#"<span class="lookup punctuation">。</span>"#,
                "</p>"
            )
        );
        assert_eq!(stats.units_created, 8);
        assert_eq!(stats.text_nodes_wrapped, 1);
    }

    #[test]
    fn text_without_ideographs_is_untouched() {
        let html = "<p>Only <b>latin</b> text、</p>";
        let (doc, stats) = segment(html);
        assert_eq!(doc.serialize(), html);
        assert_eq!(stats.units_created, 0);
        assert_eq!(stats.text_nodes_visited, 3);
    }

    #[test]
    fn slices_yield_after_batch_size_nodes() {
        let profile = ScriptProfile::literary_chinese();
        let html: String = (0..25).map(|_| "<p>佛</p>").collect();
        let mut doc = Document::parse(&html).unwrap();
        let mut segmenter = Segmenter::new(10);
        assert!(segmenter.start(&doc));
        assert_eq!(segmenter.step(&mut doc, &profile), SegmentProgress::Pending);
        assert_eq!(segmenter.stats().text_nodes_visited, 10);
        assert_eq!(segmenter.step(&mut doc, &profile), SegmentProgress::Pending);
        let SegmentProgress::Complete(stats) = segmenter.step(&mut doc, &profile) else {
            panic!("third slice should finish");
        };
        assert_eq!(stats.units_created, 25);
    }

    #[test]
    fn second_start_is_a_no_op() {
        let profile = ScriptProfile::literary_chinese();
        let html: String = (0..15).map(|_| "<p>佛法</p>").collect();
        let mut doc = Document::parse(&html).unwrap();
        let mut segmenter = Segmenter::new(10);
        assert!(segmenter.start(&doc));
        segmenter.step(&mut doc, &profile);
        assert!(!segmenter.start(&doc));
        while segmenter.step(&mut doc, &profile) == SegmentProgress::Pending {}
        assert!(!segmenter.start(&doc));

        let mut count = 0;
        let mut cursor = first(&doc, UnitFilter::Any);
        while let Some(node) = cursor {
            assert_eq!(unit_text(&doc, node).chars().count(), 1);
            count += 1;
            cursor = next(&doc, node, UnitFilter::Any);
        }
        assert_eq!(count, 30);
    }

    #[test]
    fn already_wrapped_units_are_not_rewrapped() {
        let (doc, _) = segment("<p>佛法</p>");
        let markup = doc.serialize();
        let (again, stats) = segment(&markup);
        assert_eq!(again.serialize(), markup);
        assert_eq!(stats.units_created, 0);
    }

    #[test]
    fn script_bodies_are_skipped_and_stray_angles_kept() {
        let (doc, stats) =
            segment("<script>var s = \"佛\"; if (a < b) {}</script><p>a < b 佛</p>");
        assert_eq!(stats.units_created, 1);
        assert_eq!(
            doc.serialize(),
            concat!(
                "<script>var s = \"佛\"; if (a < b) {}</script>",
                r#"<p>a &lt; b <span class="lookup">佛</span></p>"#
            )
        );
    }
}
