//! Floating gloss popup: markup, measurement and viewport-aware placement.

use askama::Template;
use serde::Serialize;
use tracing::warn;

use crate::dom::{Document, NodeId};
use crate::resolve::MatchRow;

/// Extra width kept between the popup and the viewport's right edge, and
/// added to the popup when it is pinned to the left edge.
pub const EDGE_MARGIN: f64 = 5.0;
/// Smallest left offset a popup may take.
pub const MIN_LEFT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Rendered popup content, before placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub html: String,
    pub rows: Vec<MatchRow>,
}

/// Geometry provided by the host page.
pub trait Layout {
    /// Document-relative box of a node, if it is laid out.
    fn bounding_box(&self, doc: &Document, node: NodeId) -> Option<Rect>;

    /// Size the content would take, measured off-screen.
    fn measure(&self, content: &PopupContent) -> Size;

    fn viewport_width(&self) -> f64;
}

#[derive(Template)]
#[template(
    source = r#"<div class="{{ container_class }}"><table>
{%- for row in rows %}
<tr{% if row.is_fallback %} class="fallback"{% endif %}><td class="ideograph">{% match row.href %}{% when Some with (href) %}<a href="{{ href }}">{{ row.sequence }}</a>{% when None %}<a>{{ row.sequence }}</a>{% endmatch %}</td> <td class="meaning"> {{ row.short_gloss }}: {{ row.long_gloss }}</td></tr>
{%- endfor %}
</table></div>"#,
    ext = "html"
)]
struct PopupTemplate<'a> {
    container_class: &'a str,
    rows: &'a [MatchRow],
}

/// Renders rows, in the order given, as popup markup.
pub fn render(rows: &[MatchRow]) -> Result<PopupContent, askama::Error> {
    let container_class = if rows.iter().any(|row| row.is_fallback) {
        "popup fallback"
    } else {
        "popup"
    };
    let html = PopupTemplate {
        container_class,
        rows,
    }
    .render()?;
    Ok(PopupContent {
        html,
        rows: rows.to_vec(),
    })
}

/// Centers the popup above the anchor, then clamps it into the viewport.
pub fn place(anchor: Rect, size: Size, viewport_width: f64) -> Rect {
    let mut width = size.width;
    let top = anchor.top - size.height;
    let mut left = anchor.left + anchor.width / 2.0 - size.width / 2.0;
    if left + size.width + EDGE_MARGIN > viewport_width {
        left = viewport_width - (size.width + EDGE_MARGIN);
    }
    if left < MIN_LEFT {
        left = MIN_LEFT;
        width = size.width + EDGE_MARGIN;
    }
    Rect {
        left,
        top,
        width,
        height: size.height,
    }
}

/// A live popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub anchor: NodeId,
    pub rect: Rect,
    pub content: PopupContent,
}

/// Owns the single live popup of a session.
#[derive(Debug, Default)]
pub struct PopupPresenter {
    current: Option<Popup>,
}

impl PopupPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Popup> {
        self.current.as_ref()
    }

    /// Replaces any live popup with one for `rows` anchored at `anchor`.
    ///
    /// Empty rows, an anchor without geometry, or a render failure leave no
    /// popup at all.
    pub fn present(
        &mut self,
        layout: &dyn Layout,
        doc: &Document,
        anchor: NodeId,
        rows: &[MatchRow],
    ) -> Option<&Popup> {
        self.dismiss();
        if rows.is_empty() {
            return None;
        }
        let content = match render(rows) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "failed to render lookup popup");
                return None;
            }
        };
        let size = layout.measure(&content);
        let anchor_box = layout.bounding_box(doc, anchor)?;
        let rect = place(anchor_box, size, layout.viewport_width());
        self.current = Some(Popup {
            anchor,
            rect,
            content,
        });
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) -> Option<Popup> {
        self.current.take()
    }

    /// Pointer left the popup itself.
    pub fn pointer_leave(&mut self) {
        self.dismiss();
    }
}

/// Monospace grid layout: every raw text character takes one cell and
/// lines wrap after `columns` cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cell_width: f64,
    pub line_height: f64,
    pub columns: usize,
    pub viewport_width: f64,
    pub padding: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            cell_width: 16.0,
            line_height: 24.0,
            columns: 60,
            viewport_width: 1000.0,
            padding: 4.0,
        }
    }
}

impl Layout for GridLayout {
    fn bounding_box(&self, doc: &Document, node: NodeId) -> Option<Rect> {
        if !doc.is_attached(node) {
            return None;
        }
        let mut offset = 0usize;
        let mut cursor = doc.next_in_order(doc.root());
        while let Some(current) = cursor {
            if current == node {
                break;
            }
            if let Some(text) = doc.text(current) {
                offset += text.chars().count();
            }
            cursor = doc.next_in_order(current);
        }
        let columns = self.columns.max(1);
        let len = doc.text_content(node).chars().count();
        Some(Rect {
            left: (offset % columns) as f64 * self.cell_width,
            top: (offset / columns) as f64 * self.line_height,
            width: len as f64 * self.cell_width,
            height: self.line_height,
        })
    }

    fn measure(&self, content: &PopupContent) -> Size {
        let widest = content
            .rows
            .iter()
            .map(|row| {
                row.sequence.chars().count()
                    + row.short_gloss.chars().count()
                    + row.long_gloss.chars().count()
                    + 3
            })
            .max()
            .unwrap_or(0);
        Size {
            width: widest as f64 * self.cell_width + 2.0 * self.padding,
            height: content.rows.len() as f64 * self.line_height + 2.0 * self.padding,
        }
    }

    fn viewport_width(&self) -> f64 {
        self.viewport_width
    }
}
