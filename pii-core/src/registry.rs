//! # Registro de Reconhecedores
//!
//! Conjunto ordenado dos reconhecedores ativos para um idioma. É montado uma
//! vez na partida (`register` recebe `&mut self`) e depois congelado dentro do
//! [`crate::AnalyzerEngine`] atrás de um `Arc`: as chamadas de análise apenas
//! leem, por isso não há lock algum.
//!
//! O registro não deduplica por tipo de entidade. Dois reconhecedores do mesmo
//! tipo coexistem e seus candidatos se resolvem na fase de sobreposição.

use std::sync::Arc;

use crate::builtin::builtin_recognizers;
use crate::error::Result;
use crate::nlp::{NlpEngine, NlpRecognizer};
use crate::recognizer::Recognizer;

pub struct RecognizerRegistry {
    language: String,
    recognizers: Vec<Arc<dyn Recognizer>>,
}

impl RecognizerRegistry {
    /// Registro vazio para `language`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            recognizers: Vec::new(),
        }
    }

    /// Registro com os reconhecedores embutidos (e-mail, telefone, SSN, cartão).
    pub fn with_builtins(language: impl Into<String>) -> Result<Self> {
        let mut registry = Self::new(language);
        for recognizer in builtin_recognizers()? {
            registry.register(recognizer);
        }
        Ok(registry)
    }

    pub fn register(&mut self, recognizer: impl Recognizer + 'static) {
        self.recognizers.push(Arc::new(recognizer));
    }

    pub fn register_shared(&mut self, recognizer: Arc<dyn Recognizer>) {
        self.recognizers.push(recognizer);
    }

    /// Registra um motor NLP externo já carregado.
    pub fn register_nlp_engine(&mut self, engine: Arc<dyn NlpEngine>) {
        self.register(NlpRecognizer::new(engine));
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Todos os reconhecedores, na ordem de registro.
    pub fn all(&self) -> &[Arc<dyn Recognizer>] {
        &self.recognizers
    }

    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// Tipos de entidade distintos, na ordem em que aparecem no registro.
    pub fn supported_entities(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for recognizer in &self.recognizers {
            for ty in recognizer.supported_entities() {
                if !types.contains(&ty) {
                    types.push(ty);
                }
            }
        }
        types
    }

    /// Reconhecedores que emitem ao menos um dos tipos pedidos
    /// (todos, quando `entity_types` é `None`).
    pub fn recognizers_for(&self, entity_types: Option<&[String]>) -> Vec<Arc<dyn Recognizer>> {
        self.recognizers
            .iter()
            .filter(|r| match entity_types {
                None => true,
                Some(types) => r.supported_entities().iter().any(|t| types.contains(t)),
            })
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for RecognizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerRegistry")
            .field("language", &self.language)
            .field(
                "recognizers",
                &self.recognizers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
