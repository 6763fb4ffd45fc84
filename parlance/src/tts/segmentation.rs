/// Sentence boundary detection for streaming TTS
/// Boundaries are purely punctuation based: a terminal mark followed by
/// whitespace or the end of the text.
pub const TERMINAL_PUNCTUATION: [char; 4] = ['.', '!', '?', '…'];

pub fn is_terminal(ch: char) -> bool {
    TERMINAL_PUNCTUATION.contains(&ch)
}

/// A sentence boundary inside a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Byte offset just past the terminal mark.
    pub end: usize,
    /// Byte offset just past the whitespace character consumed with the mark.
    /// Equal to `end` when the mark closes the text.
    pub next: usize,
}

/// Iterator over the boundaries of a text, left to right.
pub struct Boundaries<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    len: usize,
}

pub fn boundaries(text: &str) -> Boundaries<'_> {
    Boundaries {
        chars: text.char_indices().peekable(),
        len: text.len(),
    }
}

impl Iterator for Boundaries<'_> {
    type Item = Boundary;

    fn next(&mut self) -> Option<Boundary> {
        while let Some((i, ch)) = self.chars.next() {
            if !is_terminal(ch) {
                continue;
            }
            let end = i + ch.len_utf8();
            match self.chars.peek().copied() {
                None => {
                    return Some(Boundary {
                        end,
                        next: self.len,
                    })
                }
                Some((j, ws)) if ws.is_whitespace() => {
                    // The whitespace belongs to this boundary
                    self.chars.next();
                    return Some(Boundary {
                        end,
                        next: j + ws.len_utf8(),
                    });
                }
                // "...?" and friends: only the last mark before whitespace counts
                Some(_) => continue,
            }
        }
        None
    }
}

/// Split a complete text into trimmed sentences.
/// Trailing text without terminal punctuation becomes the last sentence.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in boundaries(text) {
        let trimmed = text[start..boundary.end].trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        start = boundary.next;
    }

    let trimmed = text[start..].trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}
