use crate::application::ml::embedding::is_word_char;

/// Headline split into word and separator pieces, with a bag-of-words index.
///
/// Words are maximal runs of alphanumeric or `_` characters. Each distinct
/// word is one explanation feature, numbered by first appearance; removing a
/// feature removes every occurrence of that word.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedText {
    pieces: Vec<Piece>,
    vocab: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Word(usize),
    Separator(String),
}

impl IndexedText {
    pub fn new(text: &str) -> Self {
        let mut pieces = Vec::new();
        let mut vocab: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut in_word = false;

        let mut flush = |buf: &mut String, word: bool, pieces: &mut Vec<Piece>| {
            if buf.is_empty() {
                return;
            }
            let piece = std::mem::take(buf);
            if word {
                let idx = match vocab.iter().position(|w| *w == piece) {
                    Some(idx) => idx,
                    None => {
                        vocab.push(piece);
                        vocab.len() - 1
                    }
                };
                pieces.push(Piece::Word(idx));
            } else {
                pieces.push(Piece::Separator(piece));
            }
        };

        for c in text.chars() {
            let word = is_word_char(c);
            if word != in_word {
                flush(&mut current, in_word, &mut pieces);
                in_word = word;
            }
            current.push(c);
        }
        flush(&mut current, in_word, &mut pieces);

        Self { pieces, vocab }
    }

    /// Number of distinct words.
    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    pub fn word(&self, idx: usize) -> &str {
        &self.vocab[idx]
    }

    pub fn words(&self) -> &[String] {
        &self.vocab
    }

    /// Rebuild the text keeping only words whose entry in `present` is true.
    /// Separators are kept as they are.
    pub fn render(&self, present: &[bool]) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Word(idx) if present.get(*idx).copied().unwrap_or(true) => {
                    out.push_str(&self.vocab[*idx])
                }
                Piece::Word(_) => {}
                Piece::Separator(s) => out.push_str(s),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_words_in_order() {
        let text = IndexedText::new("Laba BBRI naik, laba bersih naik 10%");
        assert_eq!(
            text.words(),
            &["Laba", "BBRI", "naik", "laba", "bersih", "10"]
        );
    }

    #[test]
    fn test_render_all_present_is_identity() {
        let raw = "Company X reports record-profit surge!";
        let text = IndexedText::new(raw);
        let all = vec![true; text.num_words()];
        assert_eq!(text.render(&all), raw);
    }

    #[test]
    fn test_render_removes_every_occurrence() {
        let text = IndexedText::new("naik lagi, naik terus");
        // vocab: naik, lagi, terus
        assert_eq!(text.render(&[false, true, true]), " lagi,  terus");
    }

    #[test]
    fn test_underscore_joins_words_like_embedder() {
        let text = IndexedText::new("net_profit naik");
        assert_eq!(text.words(), &["net_profit", "naik"]);
    }

    #[test]
    fn test_no_words() {
        let text = IndexedText::new("  --- !!! ");
        assert_eq!(text.num_words(), 0);
        assert_eq!(text.render(&[]), "  --- !!! ");
        assert_eq!(IndexedText::new("").num_words(), 0);
    }
}
