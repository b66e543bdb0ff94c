//! # Configuração do Analisador
//!
//! Lida de um arquivo TOML e sobrescrita por variáveis de ambiente:
//!
//! | Variável              | Campo             |
//! |-----------------------|-------------------|
//! | `PII_LANGUAGE`        | `language`        |
//! | `PII_SCORE_THRESHOLD` | `score_threshold` |
//! | `PII_NLP_MODEL`       | `nlp_model`       |
//! | `PII_BIND_ADDR`       | `bind_addr`       |
//!
//! ```toml
//! language = "en"
//! score_threshold = 0.4
//! entity_types = ["EMAIL_ADDRESS", "PHONE_NUMBER", "US_SSN", "CREDIT_CARD"]
//! nlp_model = "models/gazetteer.json"
//!
//! [[deny_lists]]
//! entity_type = "PROJECT_CODENAME"
//! score = 0.8
//! words = ["bluebird"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::{AnalyzerEngine, DEFAULT_SCORE_THRESHOLD};
use crate::error::{AnalyzerError, Result};
use crate::nlp::{GazetteerNlpEngine, NlpEngine};
use crate::recognizer::PatternRecognizer;
use crate::registry::RecognizerRegistry;

/// Lista de termos literais registrada como reconhecedor próprio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenyListConfig {
    pub entity_type: String,
    #[serde(default = "default_deny_list_score")]
    pub score: f64,
    pub words: Vec<String>,
}

fn default_deny_list_score() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Único idioma suportado pela implantação
    pub language: String,
    /// Limiar padrão; requisições podem sobrescrever
    pub score_threshold: f64,
    /// Escopo padrão de tipos (`None` = todos os registrados)
    pub entity_types: Option<Vec<String>>,
    /// Artefato do motor NLP; sem ele só os padrões rodam
    pub nlp_model: Option<PathBuf>,
    pub deny_lists: Vec<DenyListConfig>,
    /// Endereço do serviço HTTP
    pub bind_addr: String,
    /// Tempo máximo por requisição no serviço
    pub request_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            entity_types: None,
            nlp_model: None,
            deny_lists: Vec::new(),
            bind_addr: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl AnalyzerConfig {
    /// Lê o arquivo, aplica as variáveis de ambiente e valida.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Arquivo opcional: sem caminho, parte dos padrões (ainda com ambiente).
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Aplica sobrescritas a partir de uma fonte de variáveis.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(language) = lookup("PII_LANGUAGE") {
            self.language = language;
        }
        if let Some(raw) = lookup("PII_SCORE_THRESHOLD") {
            self.score_threshold = raw.trim().parse().map_err(|_| {
                AnalyzerError::InvalidConfiguration(format!(
                    "PII_SCORE_THRESHOLD is not a number: {raw}"
                ))
            })?;
        }
        if let Some(model) = lookup("PII_NLP_MODEL") {
            self.nlp_model = Some(PathBuf::from(model));
        }
        if let Some(addr) = lookup("PII_BIND_ADDR") {
            self.bind_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfiguration(
                "language must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(AnalyzerError::InvalidConfiguration(format!(
                "score_threshold {} outside [0, 1]",
                self.score_threshold
            )));
        }
        for list in &self.deny_lists {
            if !(0.0..=1.0).contains(&list.score) {
                return Err(AnalyzerError::InvalidConfiguration(format!(
                    "deny list '{}' has score {} outside [0, 1]",
                    list.entity_type, list.score
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfiguration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.entity_types.as_ref().is_some_and(|t| t.is_empty()) {
            warn!("entity_types está vazio: nenhuma entidade será detectada");
        }
        Ok(())
    }

    /// Monta o motor completo: embutidos, listas de termos e, se configurado,
    /// o modelo NLP. Falha ao carregar o modelo é fatal para quem chama.
    pub fn build_engine(&self) -> Result<AnalyzerEngine> {
        let nlp = match &self.nlp_model {
            Some(path) => Some(Arc::new(GazetteerNlpEngine::load(path)?) as Arc<dyn NlpEngine>),
            None => None,
        };
        self.build_engine_with(nlp)
    }

    /// Como [`Self::build_engine`], recebendo o motor NLP já construído.
    pub fn build_engine_with(&self, nlp: Option<Arc<dyn NlpEngine>>) -> Result<AnalyzerEngine> {
        let mut registry = RecognizerRegistry::with_builtins(&self.language)?;
        for list in &self.deny_lists {
            registry.register(PatternRecognizer::from_deny_list(
                &list.entity_type,
                list.words.as_slice(),
                list.score,
            )?);
        }
        if let Some(engine) = nlp {
            if engine.language() != registry.language() {
                return Err(AnalyzerError::ModelLoad(format!(
                    "model '{}' is for language '{}', analyzer is configured for '{}'",
                    engine.name(),
                    engine.language(),
                    registry.language()
                )));
            }
            registry.register_nlp_engine(engine);
        }

        info!(
            language = %self.language,
            recognizers = registry.len(),
            threshold = self.score_threshold,
            "Registro de reconhecedores montado"
        );

        let mut engine = AnalyzerEngine::new(registry).with_default_threshold(self.score_threshold)?;
        if let Some(types) = &self.entity_types {
            engine = engine.with_default_entity_types(types.clone());
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_toml("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.score_threshold, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let config = AnalyzerConfig::from_toml(
            r#"
            language = "en"
            score_threshold = 0.6
            entity_types = ["US_SSN"]

            [[deny_lists]]
            entity_type = "PROJECT_CODENAME"
            words = ["bluebird"]
            "#,
        )
        .unwrap();
        assert_eq!(config.score_threshold, 0.6);
        assert_eq!(config.entity_types, Some(vec!["US_SSN".to_string()]));
        assert_eq!(config.deny_lists[0].score, 1.0);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [("PII_SCORE_THRESHOLD", "0.75"), ("PII_BIND_ADDR", "127.0.0.1:8080")].into();
        let mut config = AnalyzerConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.score_threshold, 0.75);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");

        let bad: HashMap<&str, &str> = [("PII_SCORE_THRESHOLD", "high")].into();
        assert!(config
            .apply_overrides(|k| bad.get(k).map(|v| v.to_string()))
            .is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = AnalyzerConfig {
            score_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalyzerError::InvalidConfiguration(_))
        ));

        let config = AnalyzerConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalyzerError::InvalidConfiguration(ref m)) if m.contains("request_timeout_secs")
        ));
    }

    #[test]
    fn test_load_from_file_and_build() {
        let mut model = tempfile::NamedTempFile::new().unwrap();
        write!(model, r#"{{"language": "en", "entities": {{"PERSON": ["Alice Smith"]}}}}"#).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "score_threshold = 0.5").unwrap();
        writeln!(file, "nlp_model = {:?}", model.path().display().to_string()).unwrap();

        let config = AnalyzerConfig::load(file.path()).unwrap();
        let engine = config.build_engine().unwrap();
        let result = engine.analyze_text("Alice Smith wrote to alice@example.com").unwrap();
        let types: Vec<&str> = result.entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec!["PERSON", "EMAIL_ADDRESS"]);
    }

    #[test]
    fn test_sample_config_and_model() {
        let config = AnalyzerConfig::from_toml(include_str!("../../config/pii.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.deny_lists[0].entity_type, "PROJECT_CODENAME");

        let model = GazetteerNlpEngine::from_json(include_str!("../../models/gazetteer.json")).unwrap();
        let engine = config.build_engine_with(Some(Arc::new(model))).unwrap();
        let result = engine
            .analyze_text("Bob Smith flew to New York for north star")
            .unwrap();
        let types: Vec<&str> = result.entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec!["PERSON", "LOCATION", "PROJECT_CODENAME"]);
    }

    #[test]
    fn test_model_language_mismatch_is_fatal() {
        let config = AnalyzerConfig {
            language: "de".to_string(),
            ..Default::default()
        };
        let model = GazetteerNlpEngine::from_json(
            r#"{"language": "en", "entities": {"PERSON": ["Alice Smith"]}}"#,
        )
        .unwrap();
        let err = config.build_engine_with(Some(Arc::new(model))).unwrap_err();
        assert!(matches!(err, AnalyzerError::ModelLoad(ref m) if m.contains("'de'")));
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let config = AnalyzerConfig {
            nlp_model: Some(PathBuf::from("/nonexistent/model.json")),
            ..Default::default()
        };
        assert!(matches!(
            config.build_engine(),
            Err(AnalyzerError::ModelLoad(_))
        ));
    }
}
