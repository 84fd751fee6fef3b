//! Structure-tagged chapter markup.
//!
//! Chapters are rendered as XHTML fragments, one top-level node per line.
//! Text nodes carry provenance attributes (`data-page`, `data-y-start`,
//! `data-y-end`, `data-y-mid`) that the image correlator reads back.

pub mod renderer;

pub use renderer::MarkupRenderer;

use crate::types::{MarkupBlock, MarkupContent};
use quick_xml::escape::escape;

pub const ATTR_PAGE: &str = "data-page";
pub const ATTR_Y_START: &str = "data-y-start";
pub const ATTR_Y_END: &str = "data-y-end";
pub const ATTR_Y_MID: &str = "data-y-mid";

impl MarkupBlock {
    pub fn new(tag: &str, content: MarkupContent) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            content,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    /// Image node spliced in by the correlator
    pub fn figure(src: &str, alt: &str, page: u32, y: f32) -> Self {
        MarkupBlock::new(
            "figure",
            MarkupContent::Image {
                src: src.to_string(),
                alt: alt.to_string(),
            },
        )
        .with_attribute("class", "image")
        .with_attribute(ATTR_PAGE, page.to_string())
        .with_attribute("data-y", format!("{:.1}", y))
    }

    /// Serialize as XHTML
    pub fn to_markup(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value.as_str())));
        }

        match &self.content {
            MarkupContent::Void => out.push_str("/>"),
            MarkupContent::Text(text) => {
                out.push('>');
                out.push_str(&escape(text.as_str()));
                out.push_str(&format!("</{}>", self.tag));
            }
            MarkupContent::Inline { tag, text } => {
                out.push_str(&format!(
                    "><{}>{}</{}></{}>",
                    tag,
                    escape(text.as_str()),
                    tag,
                    self.tag
                ));
            }
            MarkupContent::Image { src, alt } => {
                out.push_str(&format!(
                    "><img src=\"{}\" alt=\"{}\"/></{}>",
                    escape(src.as_str()),
                    escape(alt.as_str()),
                    self.tag
                ));
            }
        }
        out
    }
}

/// Join nodes one per line
pub fn serialize_nodes(nodes: &[MarkupBlock]) -> String {
    nodes
        .iter()
        .map(MarkupBlock::to_markup)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_each_content_kind() {
        let paragraph = MarkupBlock::new("p", MarkupContent::Text("Fish & chips <hot>".to_string()))
            .with_attribute(ATTR_PAGE, "3");
        assert_eq!(
            paragraph.to_markup(),
            r#"<p data-page="3">Fish &amp; chips &lt;hot&gt;</p>"#
        );

        let caption = MarkupBlock::new(
            "p",
            MarkupContent::Inline {
                tag: "em".to_string(),
                text: "Plate 1".to_string(),
            },
        )
        .with_attribute("class", "caption");
        assert_eq!(caption.to_markup(), r#"<p class="caption"><em>Plate 1</em></p>"#);

        assert_eq!(MarkupBlock::new("hr", MarkupContent::Void).to_markup(), "<hr/>");

        let figure = MarkupBlock::figure("images/p1_0.png", "Figure 1", 1, 240.0);
        assert_eq!(
            figure.to_markup(),
            r#"<figure class="image" data-page="1" data-y="240.0"><img src="images/p1_0.png" alt="Figure 1"/></figure>"#
        );
    }
}
