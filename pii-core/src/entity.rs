//! # Tipos de Entidade e Candidatos
//!
//! Define os rótulos de entidade PII embutidos e a estrutura de um
//! **candidato** (span tentativo) produzido por um reconhecedor.
//!
//! ## Tipos embutidos
//!
//! | Rótulo          | Significado                  | Exemplo                 |
//! |-----------------|------------------------------|-------------------------|
//! | EMAIL_ADDRESS   | Endereço de e-mail           | alice@example.com       |
//! | PHONE_NUMBER    | Telefone                     | 555-123-4567            |
//! | US_SSN          | Social Security Number (EUA) | 123-45-6789             |
//! | CREDIT_CARD     | Cartão de crédito            | 4111 1111 1111 1111     |
//!
//! Os tipos são strings e não um `enum` fechado: reconhecedores customizados
//! (listas de termos, modelos NLP) podem introduzir rótulos próprios como
//! `PERSON` ou `LOCATION`.

use serde::{Deserialize, Serialize};

pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const PHONE_NUMBER: &str = "PHONE_NUMBER";
pub const US_SSN: &str = "US_SSN";
pub const CREDIT_CARD: &str = "CREDIT_CARD";

/// Todos os tipos cobertos pelos reconhecedores embutidos, em ordem de registro.
pub const BUILTIN_ENTITY_TYPES: [&str; 4] = [EMAIL_ADDRESS, PHONE_NUMBER, US_SSN, CREDIT_CARD];

/// Um candidato produzido por um reconhecedor antes da resolução de sobreposições.
///
/// Invariante: `start < end <= text.len()` (offsets em bytes, sempre em
/// fronteiras de caractere UTF-8) e `0.0 <= score <= 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerResult {
    /// Rótulo da entidade (ex: "US_SSN")
    pub entity_type: String,
    /// Posição de byte inicial (inclusiva)
    pub start: usize,
    /// Posição de byte final (exclusiva)
    pub end: usize,
    /// Confiança do reconhecedor (0.0 a 1.0)
    pub score: f64,
    /// Nome do reconhecedor que produziu o candidato
    pub recognizer: String,
    /// Padrão que casou, quando o reconhecedor é baseado em padrões
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_name: Option<String>,
}

impl RecognizerResult {
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
            score,
            recognizer: String::new(),
            pattern_name: None,
        }
    }

    /// Comprimento do span em bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Dois spans conflitam se compartilham ao menos uma posição `[start, end)`,
    /// independentemente do tipo.
    pub fn overlaps(&self, other: &RecognizerResult) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Verifica a invariante de span/score contra o texto analisado.
    pub fn is_well_formed(&self, text: &str) -> bool {
        self.start < self.end
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end)
            && (0.0..=1.0).contains(&self.score)
    }
}
