//! # Tokenizador
//!
//! Divide o texto em palavras preservando a posição original de cada uma
//! (offsets em bytes). É usado pelo motor NLP de gazetteers para casar
//! entradas de uma ou mais palavras e devolver spans exatos no texto.
//!
//! A segmentação segue as fronteiras de palavra do Unicode (UAX #29) via
//! `unicode-segmentation`; espaços e pontuação isolada são descartados.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Alice", "O'Brien").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
}

impl Token {
    /// Forma normalizada usada nas comparações com gazetteers.
    pub fn normalized(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Tokeniza um texto em palavras.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.split_word_bound_indices()
        .filter(|(_, word)| word.chars().any(char::is_alphanumeric))
        .enumerate()
        .map(|(index, (start, word))| Token {
            text: word.to_string(),
            start,
            end: start + word.len(),
            index,
        })
        .collect()
}
