//! # pii-core — Detecção de Informações Pessoais Identificáveis (PII)
//!
//! Este crate classifica texto livre em busca de PII (e-mails, telefones, SSNs,
//! cartões de crédito) e devolve entidades tipadas, pontuadas e localizadas por
//! posição no texto original.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui por um orquestrador que combina detectores independentes:
//!
//! 1.  **Padrões** ([`pattern`]): tripla imutável (nome, regex, score base).
//! 2.  **Reconhecedores** ([`recognizer`], [`builtin`], [`nlp`]): produzem
//!     candidatos `(tipo, start, end, score)` a partir do texto.
//! 3.  **Registro** ([`registry`]): conjunto ordenado de reconhecedores ativos,
//!     montado uma vez e compartilhado sem locks.
//! 4.  **Analisador** ([`analyzer`]): coleta candidatos, resolve sobreposições,
//!     aplica limiar e filtros.
//! 5.  **Saída** ([`result`]): lista de [`PiiEntity`] e o relatório JSON com
//!     `has_pii` derivado.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pii_core::{AnalysisRequest, AnalyzerEngine, EntityFields};
//!
//! // 1. Instancia o motor com os reconhecedores embutidos
//! let engine = AnalyzerEngine::with_builtins("en").unwrap();
//!
//! // 2. Analisa o texto com o limiar padrão (0.4)
//! let result = engine
//!     .analyze(&AnalysisRequest::new("Contact me at alice@example.com or 555-123-4567."))
//!     .unwrap();
//!
//! // 3. Relatório no formato do CLI: tipo, texto e score
//! let report = result.report(EntityFields::Text);
//! assert!(report.has_pii);
//! assert_eq!(report.entities.len(), 2);
//! ```

pub mod analyzer;
pub mod builtin;
pub mod config;
pub mod entity;
pub mod error;
pub mod nlp;
pub mod pattern;
pub mod recognizer;
pub mod registry;
pub mod result;
pub mod tokenizer;

pub use analyzer::{AnalysisEvent, AnalysisRequest, AnalyzerEngine, DEFAULT_SCORE_THRESHOLD};
pub use config::AnalyzerConfig;
pub use entity::RecognizerResult;
pub use error::{AnalyzerError, Result};
pub use nlp::{GazetteerNlpEngine, NlpEngine, NlpEntity, NlpRecognizer};
pub use pattern::Pattern;
pub use recognizer::{PatternRecognizer, Recognizer};
pub use registry::RecognizerRegistry;
pub use result::{AnalysisResult, EntityFields, PiiEntity, PiiReport, ReportEntity};
