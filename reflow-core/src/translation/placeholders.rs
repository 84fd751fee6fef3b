use quick_xml::escape::{escape, unescape};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use uuid::Uuid;

/// Atomic constructs that must survive translation byte for byte:
/// figures, inline svg and any self-closed element (img, hr, br, media sources).
static PROTECTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<figure\b[^>]*>.*?</figure>|<svg\b[^>]*>.*?</svg>|<[A-Za-z][\w:-]*\b[^<>]*/>")
        .unwrap()
});

/// Leaf text container: opening tag, raw inner text without child tags, closing tag.
/// The regex crate has no backreferences, so tag names are compared by the caller.
static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<(h[1-6]|p|em|strong|small|li|figcaption|blockquote|span)(\s[^<>]*)?>([^<]*)</(h[1-6]|p|em|strong|small|li|figcaption|blockquote|span)>",
    )
    .unwrap()
});

/// A text container lifted out of the markup.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub tag: String,
    /// Attribute text exactly as it appeared, including the leading space
    pub attributes: String,
    /// Inner text as it appeared in the markup (still escaped)
    pub raw: String,
    /// Unescaped inner text submitted for translation
    pub text: String,
}

impl TextSpan {
    /// Rebuild the container; `None` restores the original inner text verbatim.
    pub fn render(&self, translated: Option<&str>) -> String {
        let inner = match translated {
            Some(text) => escape(text).into_owned(),
            None => self.raw.clone(),
        };
        format!("<{}{}>{}</{}>", self.tag, self.attributes, inner, self.tag)
    }
}

/// Markup with protected constructs and text containers replaced by tokens.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub markup: String,
    pub protected: Vec<String>,
    pub spans: Vec<TextSpan>,
    nonce: String,
}

impl Skeleton {
    /// Two-pass extraction. Containers whose text is shorter than `min_chars`
    /// stay in the skeleton untouched.
    pub fn extract(markup: &str, min_chars: usize) -> Self {
        let nonce = Uuid::new_v4().simple().to_string();
        let mut protected = Vec::new();

        let first_pass = PROTECTED_RE.replace_all(markup, |caps: &Captures| {
            protected.push(caps[0].to_string());
            protected_token(&nonce, protected.len() - 1)
        });

        let marker = token_prefix(&nonce);
        let mut spans = Vec::new();
        let second_pass = CONTAINER_RE.replace_all(&first_pass, |caps: &Captures| {
            let whole = caps[0].to_string();
            let raw = &caps[3];
            if caps[1] != caps[4] || raw.contains(&marker) {
                return whole;
            }

            let text = unescape(raw)
                .map(|t| t.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            if text.trim().chars().count() < min_chars {
                return whole;
            }

            spans.push(TextSpan {
                tag: caps[1].to_string(),
                attributes: caps.get(2).map_or(String::new(), |m| m.as_str().to_string()),
                raw: raw.to_string(),
                text,
            });
            text_token(&nonce, spans.len() - 1)
        });

        let markup = second_pass.into_owned();
        Self {
            markup,
            protected,
            spans,
            nonce,
        }
    }

    /// Substitute text tokens first, then protected constructs.
    /// `translations[i]` is `None` when span `i` keeps its original text.
    pub fn reassemble(&self, translations: &[Option<String>]) -> String {
        let mut out = self.markup.clone();
        for (i, span) in self.spans.iter().enumerate() {
            let translated = translations.get(i).and_then(|t| t.as_deref());
            out = out.replacen(&text_token(&self.nonce, i), &span.render(translated), 1);
        }
        for (i, fragment) in self.protected.iter().enumerate() {
            out = out.replacen(&protected_token(&self.nonce, i), fragment, 1);
        }
        out
    }
}

fn token_prefix(nonce: &str) -> String {
    format!("@@RFL{}", nonce)
}

fn protected_token(nonce: &str, index: usize) -> String {
    format!("@@RFL{}P{}@@", nonce, index)
}

fn text_token(nonce: &str, index: usize) -> String {
    format!("@@RFL{}T{}@@", nonce, index)
}
