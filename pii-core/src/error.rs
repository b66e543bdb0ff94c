//! # Erros do Motor de Análise
//!
//! Taxonomia dos erros que o motor pode devolver ao chamador:
//!
//! | Variante                | Origem                                     | Recuperável? |
//! |-------------------------|--------------------------------------------|--------------|
//! | `UnsupportedLanguage`   | idioma da requisição ≠ idioma configurado  | não          |
//! | `InvalidConfiguration`  | limiar fora de [0,1], score de padrão etc. | não          |
//! | `InvalidPattern`        | expressão regular malformada               | não          |
//! | `Recognizer`            | falha interna de um reconhecedor           | isolada      |
//! | `ModelLoad`             | artefato do modelo NLP não carregou        | fatal        |
//!
//! Erros de `Recognizer` nunca chegam ao chamador de `analyze`: o orquestrador
//! os registra e segue com os demais reconhecedores.

use thiserror::Error;

/// Erro principal do crate.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("recognizer '{recognizer}' failed: {message}")]
    Recognizer { recognizer: String, message: String },

    #[error("failed to load NLP model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Atalho para resultados do crate.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Indica se o erro é responsabilidade de quem chamou (entrada/configuração)
    /// e não uma falha do processo.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::UnsupportedLanguage(_) | AnalyzerError::InvalidConfiguration(_)
        )
    }
}
