//! # Montagem do Resultado
//!
//! Converte as entidades internas (após sobreposição e filtros) na forma
//! entregue aos consumidores. É puro mapeamento: nada aqui altera o que foi
//! detectado.
//!
//! ## Campos por modo de consumo
//!
//! | Modo                 | `type` | `text` | `score` | `start`/`end` |
//! |----------------------|--------|--------|---------|---------------|
//! | `EntityFields::Text` (CLI)       | ✓ | ✓ | ✓ |   |
//! | `EntityFields::Offsets` (serviço) | ✓ |   | ✓ | ✓ |
//! | `EntityFields::Full`             | ✓ | ✓ | ✓ | ✓ |
//!
//! O score externo é arredondado para duas casas decimais.

use serde::{Deserialize, Serialize};

use crate::entity::RecognizerResult;

/// Entidade PII final, com o trecho literal do texto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntity {
    pub entity_type: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Score sem arredondamento
    pub score: f64,
}

impl PiiEntity {
    /// Extrai `text[start..end]` do candidato vencedor.
    pub fn from_candidate(candidate: &RecognizerResult, text: &str) -> Self {
        Self {
            entity_type: candidate.entity_type.clone(),
            text: text[candidate.start..candidate.end].to_string(),
            start: candidate.start,
            end: candidate.end,
            score: candidate.score,
        }
    }
}

/// Resultado de uma análise. `has_pii` é derivado da lista, nunca guardado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub entities: Vec<PiiEntity>,
}

impl AnalysisResult {
    pub fn new(entities: Vec<PiiEntity>) -> Self {
        Self { entities }
    }

    pub fn has_pii(&self) -> bool {
        !self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Monta o relatório externo com os campos escolhidos.
    pub fn report(&self, fields: EntityFields) -> PiiReport {
        let with_text = matches!(fields, EntityFields::Text | EntityFields::Full);
        let with_offsets = matches!(fields, EntityFields::Offsets | EntityFields::Full);

        PiiReport {
            has_pii: self.has_pii(),
            entities: self
                .entities
                .iter()
                .map(|e| ReportEntity {
                    entity_type: e.entity_type.clone(),
                    text: with_text.then(|| e.text.clone()),
                    score: round_score(e.score),
                    start: with_offsets.then_some(e.start),
                    end: with_offsets.then_some(e.end),
                })
                .collect(),
        }
    }
}

/// Quais campos opcionais aparecem em cada entidade do relatório.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFields {
    /// tipo, texto e score
    #[default]
    Text,
    /// tipo, score, start e end
    Offsets,
    /// todos
    Full,
}

/// Documento JSON entregue pelo CLI e pelo serviço.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiReport {
    pub has_pii: bool,
    pub entities: Vec<ReportEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// Arredonda para duas casas decimais.
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
