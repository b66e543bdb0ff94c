//! # Capacidade NLP Externa
//!
//! O reconhecimento estatístico de entidades (nomes de pessoas, lugares...) é
//! uma dependência externa: um tokenizador mais um modelo que, dado um texto e
//! um idioma, devolve spans `(tipo, start, end, score)`. O motor de PII só
//! conhece esse contrato, expresso pelo trait [`NlpEngine`].
//!
//! ## Ciclo de vida
//!
//! Carregar um modelo é caro. O motor é construído **uma vez** na partida do
//! processo e passado explicitamente (`Arc<dyn NlpEngine>`) para o registro de
//! reconhecedores. Depois disso é tratado como somente leitura e compartilhado
//! entre todas as chamadas concorrentes.
//!
//! ## Implementações
//!
//! - [`GazetteerNlpEngine`]: "modelo" carregado de um artefato JSON com listas
//!   de entidades conhecidas, casadas por n-gramas de tokens.
//! - Em testes, qualquer stub que implemente [`NlpEngine`].
//!
//! O adaptador [`NlpRecognizer`] encaixa um motor no registro como mais um
//! [`Recognizer`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entity::RecognizerResult;
use crate::error::{AnalyzerError, Result};
use crate::recognizer::Recognizer;
use crate::tokenizer::{tokenize, Token};

/// Span devolvido por um motor NLP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpEntity {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

/// Contrato do reconhecedor estatístico externo.
pub trait NlpEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Idioma para o qual o modelo foi carregado
    fn language(&self) -> &str;

    fn supported_entities(&self) -> Vec<String>;

    fn process(&self, text: &str, language: &str) -> Result<Vec<NlpEntity>>;
}

/// Adaptador que expõe um [`NlpEngine`] como [`Recognizer`].
pub struct NlpRecognizer {
    name: String,
    engine: Arc<dyn NlpEngine>,
    entities: Vec<String>,
}

impl NlpRecognizer {
    /// Expõe todos os tipos suportados pelo motor.
    pub fn new(engine: Arc<dyn NlpEngine>) -> Self {
        let entities = engine.supported_entities();
        Self::with_entities(engine, entities)
    }

    /// Expõe apenas `entities`; spans de outros tipos são ignorados.
    pub fn with_entities(engine: Arc<dyn NlpEngine>, entities: Vec<String>) -> Self {
        Self {
            name: format!("NlpRecognizer({})", engine.name()),
            engine,
            entities,
        }
    }
}

impl Recognizer for NlpRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_entities(&self) -> Vec<String> {
        self.entities.clone()
    }

    fn analyze(&self, text: &str, language: &str) -> Result<Vec<RecognizerResult>> {
        let spans = self
            .engine
            .process(text, language)
            .map_err(|e| AnalyzerError::Recognizer {
                recognizer: self.name.clone(),
                message: e.to_string(),
            })?;

        Ok(spans
            .into_iter()
            .filter(|s| self.entities.contains(&s.entity_type))
            .map(|s| RecognizerResult {
                entity_type: s.entity_type,
                start: s.start,
                end: s.end,
                score: s.score,
                recognizer: self.name.clone(),
                pattern_name: None,
            })
            .collect())
    }
}

/// Formato do artefato JSON do motor de gazetteers.
///
/// ```json
/// { "language": "en", "score": 0.85,
///   "entities": { "PERSON": ["Alice Smith"], "LOCATION": ["New York"] } }
/// ```
#[derive(Debug, Deserialize)]
struct GazetteerArtifact {
    language: String,
    #[serde(default = "default_gazetteer_score")]
    score: f64,
    entities: BTreeMap<String, Vec<String>>,
}

fn default_gazetteer_score() -> f64 {
    0.85
}

/// Motor NLP baseado em listas de entidades conhecidas.
///
/// Cada entrada é tokenizada e guardada em minúsculas; a busca percorre os
/// tokens do texto e tenta sempre a entrada mais longa primeiro
/// ("New York City" vence "New York").
pub struct GazetteerNlpEngine {
    language: String,
    score: f64,
    /// (tipo, tokens normalizados), ordenado do maior para o menor n-grama
    entries: Vec<(String, Vec<String>)>,
}

impl GazetteerNlpEngine {
    /// Carrega o artefato do disco. Qualquer falha é `ModelLoad`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalyzerError::ModelLoad(format!("{}: {e}", path.display())))?;
        let engine = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            entries = engine.entries.len(),
            language = %engine.language,
            "Modelo de gazetteers carregado"
        );
        Ok(engine)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let artifact: GazetteerArtifact =
            serde_json::from_str(content).map_err(|e| AnalyzerError::ModelLoad(e.to_string()))?;
        if !(0.0..=1.0).contains(&artifact.score) {
            return Err(AnalyzerError::ModelLoad(format!(
                "score {} outside [0, 1]",
                artifact.score
            )));
        }
        Ok(Self::from_entries(
            artifact.language,
            artifact.score,
            artifact
                .entities
                .into_iter()
                .flat_map(|(ty, names)| names.into_iter().map(move |n| (ty.clone(), n))),
        ))
    }

    pub fn from_entries<I, T, N>(language: impl Into<String>, score: f64, entries: I) -> Self
    where
        I: IntoIterator<Item = (T, N)>,
        T: Into<String>,
        N: AsRef<str>,
    {
        let mut entries: Vec<(String, Vec<String>)> = entries
            .into_iter()
            .map(|(ty, name)| {
                let parts: Vec<String> = tokenize(name.as_ref()).iter().map(Token::normalized).collect();
                let ty: String = ty.into();
                (ty, parts)
            })
            .filter(|(_, parts): &(String, Vec<String>)| !parts.is_empty())
            .collect();
        // sort estável: empates mantêm a ordem do artefato
        entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        Self {
            language: language.into(),
            score,
            entries,
        }
    }
}

impl NlpEngine for GazetteerNlpEngine {
    fn name(&self) -> &str {
        "gazetteer"
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn supported_entities(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for (ty, _) in &self.entries {
            if !types.contains(ty) {
                types.push(ty.clone());
            }
        }
        types.sort();
        types
    }

    fn process(&self, text: &str, language: &str) -> Result<Vec<NlpEntity>> {
        if language != self.language {
            return Err(AnalyzerError::UnsupportedLanguage(language.to_string()));
        }

        let tokens = tokenize(text);
        let normalized: Vec<String> = tokens.iter().map(Token::normalized).collect();
        let mut found = Vec::new();
        let mut i = 0;

        'outer: while i < tokens.len() {
            for (ty, parts) in &self.entries {
                let n = parts.len();
                if i + n > tokens.len() || normalized[i..i + n] != parts[..] {
                    continue;
                }
                // Os tokens do n-grama devem estar separados só por espaço
                let adjacent = tokens[i..i + n]
                    .windows(2)
                    .all(|w| text[w[0].end..w[1].start].trim().is_empty());
                if adjacent {
                    found.push(NlpEntity {
                        entity_type: ty.clone(),
                        start: tokens[i].start,
                        end: tokens[i + n - 1].end,
                        score: self.score,
                    });
                    i += n;
                    continue 'outer;
                }
            }
            i += 1;
        }

        Ok(found)
    }
}
