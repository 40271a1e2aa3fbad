/// Tokenization used by the text-field splitter.
pub struct Vocabulary;

impl Vocabulary {
    /// Splits a text field into lower-cased word tokens on whitespace and
    /// punctuation. Empty tokens are discarded.
    pub fn split_text_field(text: &str) -> Vec<String> {
        text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
            .filter(|token| !token.is_empty())
            .map(|token| token.trim_matches('\'').to_lowercase())
            .filter(|token| !token.is_empty())
            .collect()
    }
}
