//! Splitting of oversized spans before submission.
//!
//! Pieces are cut on paragraph breaks first, then on sentence ends, then on
//! whitespace as a last resort. Each chunk remembers the separator that
//! followed it so translated pieces can be re-joined the same way.

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Inserted between this chunk's translation and the next one
    pub joiner: &'static str,
}

const PARAGRAPH_BREAK: &str = "\n\n";
const SENTENCE_BREAK: &str = " ";

/// Split `text` into chunks of at most `max_chars` characters.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    if char_len(text) <= max_chars {
        return vec![Chunk {
            text: text.to_string(),
            joiner: "",
        }];
    }

    let mut pieces: Vec<(String, &'static str)> = Vec::new();
    let paragraphs: Vec<&str> = text
        .split(PARAGRAPH_BREAK)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    for paragraph in paragraphs {
        if char_len(paragraph) <= max_chars {
            pieces.push((paragraph.to_string(), PARAGRAPH_BREAK));
            continue;
        }
        for sentence in split_sentences(paragraph) {
            if char_len(&sentence) <= max_chars {
                pieces.push((sentence, SENTENCE_BREAK));
            } else {
                pieces.extend(split_on_whitespace(&sentence, max_chars));
            }
        }
        if let Some(last) = pieces.last_mut() {
            last.1 = PARAGRAPH_BREAK;
        }
    }

    pack(pieces, max_chars)
}

/// Re-join translated chunk texts using each chunk's separator.
pub fn join_chunks(chunks: &[Chunk], translated: &[String]) -> String {
    let mut out = String::new();
    for (i, (chunk, text)) in chunks.iter().zip(translated).enumerate() {
        out.push_str(text.trim());
        if i + 1 < chunks.len() {
            out.push_str(chunk.joiner);
        }
    }
    out
}

/// Greedily merge adjacent pieces while they fit.
fn pack(pieces: Vec<(String, &'static str)>, max_chars: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Option<Chunk> = None;

    for (text, joiner) in pieces {
        current = match current.take() {
            Some(open)
                if char_len(&open.text) + open.joiner.len() + char_len(&text) <= max_chars =>
            {
                Some(Chunk {
                    text: format!("{}{}{}", open.text, open.joiner, text),
                    joiner,
                })
            }
            Some(open) => {
                chunks.push(open);
                Some(Chunk { text, joiner })
            }
            None => Some(Chunk { text, joiner }),
        };
    }

    if let Some(open) = current {
        chunks.push(open);
    }
    chunks
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_end = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(false, |next| next.is_whitespace());
        if at_end {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

/// Word-wrap an overlong sentence; words longer than a chunk are cut with no joiner.
fn split_on_whitespace(sentence: &str, max_chars: usize) -> Vec<(String, &'static str)> {
    let mut parts: Vec<(String, &'static str)> = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        if !current.is_empty() && char_len(&current) + 1 + char_len(word) > max_chars {
            parts.push((std::mem::take(&mut current), SENTENCE_BREAK));
        }
        if char_len(word) > max_chars {
            if !current.is_empty() {
                parts.push((std::mem::take(&mut current), SENTENCE_BREAK));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                parts.push((piece.iter().collect(), ""));
            }
            if let Some(last) = parts.last_mut() {
                last.1 = SENTENCE_BREAK;
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        parts.push((current, SENTENCE_BREAK));
    }
    parts
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_into_chunks("Hello there.", 4500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello there.");
    }

    #[test]
    fn splits_on_paragraphs_then_sentences() {
        let text = "First one. Second one.\n\nThird paragraph here.";
        let chunks = split_into_chunks(text, 22);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["First one. Second one.", "Third paragraph here."]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 22));

        let sentences = split_into_chunks("Alpha beta. Gamma delta! Epsilon?", 12);
        let texts: Vec<&str> = sentences.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Alpha beta.", "Gamma delta!", "Epsilon?"]);
    }

    #[test]
    fn join_restores_separators() {
        let text = "One. Two.\n\nThree.";
        let chunks = split_into_chunks(text, 5);
        let translated: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        assert_eq!(join_chunks(&chunks, &translated), "One. Two.\n\nThree.");
    }

    #[test]
    fn long_words_are_hard_split() {
        let chunks = split_into_chunks("abcdefghij", 4);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 4));
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, "abcdefghij");
    }
}
