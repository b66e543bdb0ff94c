//! # Padrões — Expressões Regulares com Confiança Base
//!
//! Um [`Pattern`] é a tripla imutável (nome, regex, score base). A regex é
//! compilada uma única vez, na construção do reconhecedor, e sem diferenciar
//! maiúsculas de minúsculas ("SSN", "ssn" e "Ssn" casam igualmente).
//!
//! O crate `regex` garante tempo linear no tamanho da entrada, então padrões
//! pouco seletivos como `\b\d{9}\b` não sofrem backtracking catastrófico.
//!
//! ## Grupo de captura
//!
//! Se a regex tem um grupo de captura e o grupo 1 participou do match, o span
//! emitido é o do grupo, não o do match inteiro. Assim um padrão de contexto
//! como `ssn[\s:=]+(\d{3}-\d{2}-\d{4})` localiza apenas os dígitos.

use regex::{Regex, RegexBuilder};

use crate::error::{AnalyzerError, Result};

/// Padrão nomeado com confiança base.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    regex: Regex,
    score: f64,
}

impl Pattern {
    /// Compila o padrão. Falha com `InvalidPattern` para regex malformada e com
    /// `InvalidConfiguration` para score fora de [0,1].
    pub fn new(name: impl Into<String>, regex: &str, score: f64) -> Result<Self> {
        let name = name.into();
        if !(0.0..=1.0).contains(&score) {
            return Err(AnalyzerError::InvalidConfiguration(format!(
                "pattern '{name}' has score {score} outside [0, 1]"
            )));
        }
        let regex = RegexBuilder::new(regex)
            .case_insensitive(true)
            .build()
            .map_err(|source| AnalyzerError::InvalidPattern {
                name: name.clone(),
                source,
            })?;
        Ok(Self { name, regex, score })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Todos os spans `(start, end)` do padrão no texto, sem sobreposição entre si.
    pub fn find_spans(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(1).or_else(|| caps.get(0))?;
                (m.start() < m.end()).then(|| (m.start(), m.end()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_regex() {
        let err = Pattern::new("broken", r"(\d{3}", 0.5).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidPattern { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_score_out_of_range() {
        assert!(matches!(
            Pattern::new("p", r"\d", 1.2),
            Err(AnalyzerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_capture_group_span() {
        let p = Pattern::new("ctx", r"ssn[\s:]+(\d{3}-\d{2}-\d{4})", 0.95).unwrap();
        let text = "SSN: 123-45-6789";
        assert_eq!(p.find_spans(text), vec![(5, 16)]);
    }

    #[test]
    fn test_whole_match_without_group() {
        let p = Pattern::new("nine", r"\b\d{9}\b", 0.7).unwrap();
        assert_eq!(p.find_spans("a 123456789 b 1234567890"), vec![(2, 11)]);
    }
}
