//! # Reconhecedores — Contrato Comum
//!
//! Todo detector de PII implementa o trait [`Recognizer`]: "dado um texto e um
//! idioma, produza candidatos". Existem duas famílias:
//!
//! - [`PatternRecognizer`]: um ou mais [`Pattern`]s ligados a um único tipo de
//!   entidade, avaliados por busca regex sobre o texto inteiro.
//! - [`crate::nlp::NlpRecognizer`]: adaptador para um motor estatístico externo.
//!
//! Reconhecedores não guardam estado mutável por chamada: `analyze` recebe
//! `&self` e pode ser invocado de várias threads ao mesmo tempo.

use crate::entity::RecognizerResult;
use crate::error::{AnalyzerError, Result};
use crate::pattern::Pattern;

/// Capacidade de produzir candidatos a partir de texto.
pub trait Recognizer: Send + Sync {
    /// Nome legível (usado em logs e no rastro de decisões)
    fn name(&self) -> &str;

    /// Tipos de entidade que este reconhecedor pode emitir
    fn supported_entities(&self) -> Vec<String>;

    /// Executa a detecção sobre `text`.
    fn analyze(&self, text: &str, language: &str) -> Result<Vec<RecognizerResult>>;
}

/// Checagem pós-match sobre o texto casado.
///
/// `true` promove o candidato a score 1.0; `false` descarta o candidato.
pub type Validator = fn(&str) -> bool;

/// Reconhecedor baseado em expressões regulares.
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    name: String,
    entity_type: String,
    patterns: Vec<Pattern>,
    validator: Option<Validator>,
}

impl PatternRecognizer {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            patterns,
            validator: None,
        }
    }

    /// Anexa um validador aplicado ao texto de cada match.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Constrói um reconhecedor a partir de uma lista de termos literais.
    ///
    /// Os termos são escapados e unidos em uma única alternância, casando sem
    /// diferenciar maiúsculas de minúsculas. `\b` só é exigido nas bordas do
    /// termo que são caracteres de palavra (`c++` e `#proj` também casam).
    pub fn from_deny_list<S: AsRef<str>>(
        entity_type: impl Into<String>,
        words: &[S],
        score: f64,
    ) -> Result<Self> {
        let entity_type = entity_type.into();
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .map(bounded_term)
            .collect();
        if alternatives.is_empty() {
            return Err(AnalyzerError::InvalidConfiguration(format!(
                "deny list for '{entity_type}' is empty"
            )));
        }
        let regex = format!("(?:{})", alternatives.join("|"));
        let pattern = Pattern::new("deny_list", &regex, score)?;
        Ok(Self::new(
            format!("DenyList({entity_type})"),
            entity_type,
            vec![pattern],
        ))
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Termo escapado com `\b` apenas nas bordas que são caracteres de palavra.
fn bounded_term(term: &str) -> String {
    let lead = if term.starts_with(is_word_char) { r"\b" } else { "" };
    let tail = if term.ends_with(is_word_char) { r"\b" } else { "" };
    format!("{lead}{}{tail}", regex::escape(term))
}

impl Recognizer for PatternRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_entities(&self) -> Vec<String> {
        vec![self.entity_type.clone()]
    }

    fn analyze(&self, text: &str, _language: &str) -> Result<Vec<RecognizerResult>> {
        let mut results = Vec::new();

        for pattern in &self.patterns {
            for (start, end) in pattern.find_spans(text) {
                let score = match self.validator {
                    Some(validate) if validate(&text[start..end]) => 1.0,
                    Some(_) => continue,
                    None => pattern.score(),
                };
                results.push(RecognizerResult {
                    entity_type: self.entity_type.clone(),
                    start,
                    end,
                    score,
                    recognizer: self.name.clone(),
                    pattern_name: Some(pattern.name().to_string()),
                });
            }
        }

        Ok(results)
    }
}
