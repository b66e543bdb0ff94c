//! # Analisador — Orquestrador com Eventos Observáveis
//!
//! O [`AnalyzerEngine`] coordena todos os reconhecedores do registro e funde
//! seus candidatos em um único conjunto de entidades **sem sobreposição**.
//!
//! ## Fluxo
//!
//! 1. **Validação**: idioma suportado e limiar em [0,1]; texto vazio devolve
//!    resultado vazio.
//! 2. **Coleta**: cada reconhecedor do escopo pedido roda sobre o texto; os
//!    candidatos vão para um único pool. Um reconhecedor que falha (ou entra em
//!    pânico) é registrado em log e ignorado; os demais seguem.
//! 3. **Resolução de sobreposições** (supressão de não-máximos): ordena por
//!    score ↓, comprimento ↓, início ↑ e mantém um candidato só se ele não
//!    sobrepõe nenhum já mantido.
//! 4. **Limiar**: descarta `score < limiar`.
//! 5. **Tipos exibidos**: se informado, mantém apenas esses tipos.
//! 6. **Ordenação** por posição inicial.
//!
//! ## Falha parcial
//!
//! Se um reconhecedor falha, a análise continua sem ele e o chamador recebe as
//! detecções dos demais. A degradação aparece no log e no evento
//! [`AnalysisEvent::RecognizerFailed`].
//!
//! ## Modos de uso
//! - **Sync**: [`AnalyzerEngine::analyze`].
//! - **Streaming**: [`AnalyzerEngine::analyze_streaming`] emite o rastro de
//!   decisões por um canal `mpsc`.
//! - **Lote**: [`AnalyzerEngine::analyze_batch`] processa vários textos em
//!   paralelo com `rayon`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::RecognizerResult;
use crate::error::{AnalyzerError, Result};
use crate::registry::RecognizerRegistry;
use crate::result::{AnalysisResult, PiiEntity};

/// Limiar padrão de score.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.4;

/// Parâmetros de uma chamada de análise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    /// Idioma; `None` usa o idioma do registro
    #[serde(default)]
    pub language: Option<String>,
    /// Tipos a detectar; `None` usa o escopo padrão do motor
    #[serde(default)]
    pub entity_types: Option<Vec<String>>,
    /// Limiar; `None` usa o padrão do motor
    #[serde(default)]
    pub score_threshold: Option<f64>,
    /// Tipos a exibir no resultado, aplicado após o limiar
    #[serde(default)]
    pub surface_entity_types: Option<Vec<String>>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_entity_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.entity_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_surface_entity_types<S: Into<String>>(
        mut self,
        types: impl IntoIterator<Item = S>,
    ) -> Self {
        self.surface_entity_types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// Eventos emitidos durante a análise (rastro de decisões).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AnalysisEvent {
    /// Um reconhecedor terminou e produziu estes candidatos.
    RecognizerFinished {
        recognizer: String,
        candidates: Vec<RecognizerResult>,
    },
    /// Um reconhecedor falhou; a análise seguiu sem ele.
    RecognizerFailed { recognizer: String, message: String },
    /// Candidato com span ou score fora da invariante, descartado.
    CandidateRejected { candidate: RecognizerResult },
    /// Candidato perdeu a disputa de sobreposição.
    CandidateSuppressed {
        candidate: RecognizerResult,
        kept_by: RecognizerResult,
    },
    /// Candidato abaixo do limiar.
    BelowThreshold {
        candidate: RecognizerResult,
        threshold: f64,
    },
    /// Candidato de um tipo que não foi pedido para exibição.
    FilteredOut { candidate: RecognizerResult },
    /// Resultado final.
    Done {
        result: AnalysisResult,
        processing_ms: u64,
    },
}

/// Orquestrador principal. Imutável depois de construído e seguro para uso
/// concorrente (`Send + Sync`), tipicamente atrás de um `Arc`.
#[derive(Debug, Clone)]
pub struct AnalyzerEngine {
    registry: Arc<RecognizerRegistry>,
    default_threshold: f64,
    default_entity_types: Option<Vec<String>>,
}

impl AnalyzerEngine {
    pub fn new(registry: RecognizerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            default_threshold: DEFAULT_SCORE_THRESHOLD,
            default_entity_types: None,
        }
    }

    /// Motor com os reconhecedores embutidos para `language`.
    pub fn with_builtins(language: &str) -> Result<Self> {
        Ok(Self::new(RecognizerRegistry::with_builtins(language)?))
    }

    pub fn with_default_threshold(mut self, threshold: f64) -> Result<Self> {
        check_threshold(threshold)?;
        self.default_threshold = threshold;
        Ok(self)
    }

    pub fn with_default_entity_types(mut self, types: Vec<String>) -> Self {
        self.default_entity_types = Some(types);
        self
    }

    pub fn registry(&self) -> &RecognizerRegistry {
        &self.registry
    }

    pub fn language(&self) -> &str {
        self.registry.language()
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Analisa apenas o texto, com todos os padrões do motor.
    pub fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        self.analyze(&AnalysisRequest::new(text))
    }

    /// Processa a requisição de forma síncrona e devolve o resultado final.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let threshold = self.validate(request)?;
        Ok(self.run(request, threshold, None))
    }

    /// Executa a análise enviando o rastro de decisões pelo canal `tx`.
    ///
    /// Erros de configuração voltam antes de qualquer evento. Em caso de
    /// sucesso, o último evento é sempre [`AnalysisEvent::Done`].
    pub fn analyze_streaming(
        &self,
        request: &AnalysisRequest,
        tx: mpsc::Sender<AnalysisEvent>,
    ) -> Result<AnalysisResult> {
        let threshold = self.validate(request)?;
        Ok(self.run(request, threshold, Some(&tx)))
    }

    /// Analisa vários textos em paralelo, preservando a ordem de entrada.
    /// `template` fornece idioma, limiar e filtros; seu texto é ignorado.
    pub fn analyze_batch<S>(&self, texts: &[S], template: &AnalysisRequest) -> Vec<Result<AnalysisResult>>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| {
                let request = AnalysisRequest {
                    text: text.as_ref().to_string(),
                    ..template.clone()
                };
                self.analyze(&request)
            })
            .collect()
    }

    fn validate(&self, request: &AnalysisRequest) -> Result<f64> {
        if let Some(language) = &request.language {
            if language != self.registry.language() {
                return Err(AnalyzerError::UnsupportedLanguage(language.clone()));
            }
        }
        let threshold = request.score_threshold.unwrap_or(self.default_threshold);
        check_threshold(threshold)?;
        Ok(threshold)
    }

    fn run(
        &self,
        request: &AnalysisRequest,
        threshold: f64,
        tx: Option<&mpsc::Sender<AnalysisEvent>>,
    ) -> AnalysisResult {
        let start = Instant::now();
        let text = request.text.as_str();
        let emit = |event: AnalysisEvent| {
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
        };

        if text.is_empty() {
            let result = AnalysisResult::default();
            emit(AnalysisEvent::Done {
                result: result.clone(),
                processing_ms: start.elapsed().as_millis() as u64,
            });
            return result;
        }

        let entity_types = request
            .entity_types
            .as_deref()
            .or(self.default_entity_types.as_deref());

        // === Passo 1: coleta de candidatos ===
        let language = self.registry.language();
        let mut pool: Vec<RecognizerResult> = Vec::new();

        for recognizer in self.registry.recognizers_for(entity_types) {
            let outcome = catch_unwind(AssertUnwindSafe(|| recognizer.analyze(text, language)))
                .unwrap_or_else(|_| {
                    Err(AnalyzerError::Recognizer {
                        recognizer: recognizer.name().to_string(),
                        message: "recognizer panicked".to_string(),
                    })
                });

            match outcome {
                Ok(candidates) => {
                    let candidates: Vec<RecognizerResult> = candidates
                        .into_iter()
                        .filter(|c| entity_types.map_or(true, |types| types.contains(&c.entity_type)))
                        .collect();
                    if tx.is_some() {
                        emit(AnalysisEvent::RecognizerFinished {
                            recognizer: recognizer.name().to_string(),
                            candidates: candidates.clone(),
                        });
                    }
                    for candidate in candidates {
                        if candidate.is_well_formed(text) {
                            pool.push(candidate);
                        } else {
                            warn!(
                                recognizer = recognizer.name(),
                                start = candidate.start,
                                end = candidate.end,
                                score = candidate.score,
                                "Candidato inválido descartado"
                            );
                            emit(AnalysisEvent::CandidateRejected { candidate });
                        }
                    }
                }
                Err(err) => {
                    warn!(recognizer = recognizer.name(), error = %err, "Reconhecedor falhou; seguindo sem ele");
                    emit(AnalysisEvent::RecognizerFailed {
                        recognizer: recognizer.name().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let total_candidates = pool.len();

        // === Passo 2: resolução de sobreposições ===
        let (kept, suppressed) = resolve_overlaps(pool);
        if tx.is_some() {
            for (candidate, kept_idx) in suppressed {
                emit(AnalysisEvent::CandidateSuppressed {
                    candidate,
                    kept_by: kept[kept_idx].clone(),
                });
            }
        }

        // === Passo 3 e 4: limiar e tipos exibidos ===
        let surface = request.surface_entity_types.as_deref();
        let mut survivors: Vec<RecognizerResult> = Vec::with_capacity(kept.len());
        for candidate in kept {
            if candidate.score < threshold {
                emit(AnalysisEvent::BelowThreshold { candidate, threshold });
            } else if surface.is_some_and(|types| !types.contains(&candidate.entity_type)) {
                emit(AnalysisEvent::FilteredOut { candidate });
            } else {
                survivors.push(candidate);
            }
        }

        // === Passo 5: ordem determinística por posição ===
        survivors.sort_by_key(|c| (c.start, c.end));

        let result = AnalysisResult::new(
            survivors
                .iter()
                .map(|c| PiiEntity::from_candidate(c, text))
                .collect(),
        );

        let processing_ms = start.elapsed().as_millis() as u64;
        debug!(
            chars = text.len(),
            candidates = total_candidates,
            entities = result.len(),
            processing_ms,
            "Análise concluída"
        );

        emit(AnalysisEvent::Done {
            result: result.clone(),
            processing_ms,
        });
        result
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(AnalyzerError::InvalidConfiguration(format!(
            "score_threshold {threshold} outside [0, 1]"
        )))
    }
}

/// Ordem de prioridade: score ↓, comprimento ↓, início ↑, tipo ↑.
/// Empates restantes ficam na ordem do pool (ordem de registro).
fn rank(a: &RecognizerResult, b: &RecognizerResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.entity_type.cmp(&b.entity_type))
}

/// Supressão de não-máximos sobre os candidatos.
///
/// Devolve os candidatos mantidos (disjuntos entre si, em ordem de prioridade)
/// e os suprimidos, cada um com o índice do mantido que o venceu.
///
/// Os mantidos ficam indexados por início num `BTreeMap`. Como são disjuntos,
/// basta olhar o último mantido que começa antes do fim do candidato: se esse
/// não sobrepõe, nenhum outro sobrepõe.
pub fn resolve_overlaps(
    mut candidates: Vec<RecognizerResult>,
) -> (Vec<RecognizerResult>, Vec<(RecognizerResult, usize)>) {
    candidates.sort_by(rank);

    let mut kept: Vec<RecognizerResult> = Vec::new();
    let mut suppressed = Vec::new();
    // start → (end, índice em `kept`)
    let mut occupied: BTreeMap<usize, (usize, usize)> = BTreeMap::new();

    for candidate in candidates {
        let blocker = occupied
            .range(..candidate.end)
            .next_back()
            .filter(|(_, (end, _))| *end > candidate.start)
            .map(|(_, (_, idx))| *idx);

        match blocker {
            Some(idx) => suppressed.push((candidate, idx)),
            None => {
                occupied.insert(candidate.start, (candidate.end, kept.len()));
                kept.push(candidate);
            }
        }
    }

    (kept, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EMAIL_ADDRESS, PHONE_NUMBER, US_SSN};
    use crate::pattern::Pattern;
    use crate::recognizer::{PatternRecognizer, Recognizer};

    fn engine() -> AnalyzerEngine {
        AnalyzerEngine::with_builtins("en").unwrap()
    }

    fn candidate(ty: &str, start: usize, end: usize, score: f64) -> RecognizerResult {
        RecognizerResult::new(ty, start, end, score)
    }

    struct Failing;

    impl Recognizer for Failing {
        fn name(&self) -> &str {
            "Failing"
        }
        fn supported_entities(&self) -> Vec<String> {
            vec![US_SSN.to_string()]
        }
        fn analyze(&self, _text: &str, _language: &str) -> Result<Vec<RecognizerResult>> {
            Err(AnalyzerError::Recognizer {
                recognizer: "Failing".into(),
                message: "model unavailable".into(),
            })
        }
    }

    struct Panicking;

    impl Recognizer for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }
        fn supported_entities(&self) -> Vec<String> {
            vec![EMAIL_ADDRESS.to_string()]
        }
        fn analyze(&self, _text: &str, _language: &str) -> Result<Vec<RecognizerResult>> {
            panic!("regex engine exploded")
        }
    }

    /// Emite spans fora do texto para exercitar a validação de invariantes.
    struct OutOfBounds;

    impl Recognizer for OutOfBounds {
        fn name(&self) -> &str {
            "OutOfBounds"
        }
        fn supported_entities(&self) -> Vec<String> {
            vec!["BROKEN".to_string()]
        }
        fn analyze(&self, text: &str, _language: &str) -> Result<Vec<RecognizerResult>> {
            Ok(vec![candidate("BROKEN", 0, text.len() + 10, 0.9)])
        }
    }

    #[test]
    fn test_resolve_overlaps_prefers_score_then_length() {
        let (kept, suppressed) = resolve_overlaps(vec![
            candidate(US_SSN, 0, 9, 0.7),
            candidate(US_SSN, 0, 9, 0.95),
            candidate(PHONE_NUMBER, 5, 15, 0.6),
            candidate(EMAIL_ADDRESS, 20, 30, 0.5),
            candidate(EMAIL_ADDRESS, 18, 30, 0.5),
        ]);
        let spans: Vec<(usize, usize, f64)> = kept.iter().map(|c| (c.start, c.end, c.score)).collect();
        assert_eq!(spans, vec![(0, 9, 0.95), (18, 30, 0.5)]);
        assert_eq!(suppressed.len(), 3);
        assert!(suppressed.iter().all(|(c, idx)| c.overlaps(&kept[*idx])));
    }

    #[test]
    fn test_resolve_overlaps_tie_prefers_earlier_start() {
        let (kept, _) = resolve_overlaps(vec![
            candidate(US_SSN, 4, 8, 0.5),
            candidate(US_SSN, 2, 6, 0.5),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start, 2);
    }

    #[test]
    fn test_resolve_overlaps_touching_spans_both_kept() {
        let (kept, suppressed) =
            resolve_overlaps(vec![candidate(US_SSN, 0, 5, 0.9), candidate(US_SSN, 5, 9, 0.8)]);
        assert_eq!(kept.len(), 2);
        assert!(suppressed.is_empty());
    }

    #[test]
    fn test_empty_text() {
        let result = engine().analyze_text("").unwrap();
        assert!(!result.has_pii());
        assert!(result.entities.is_empty());
    }

    #[test]
    fn test_unsupported_language() {
        let err = engine()
            .analyze(&AnalysisRequest::new("x").with_language("pt"))
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedLanguage(ref l) if l == "pt"));
    }

    #[test]
    fn test_threshold_out_of_range_not_clamped() {
        for bad in [-0.1, 1.01, f64::NAN] {
            let err = engine()
                .analyze(&AnalysisRequest::new("123-45-6789").with_score_threshold(bad))
                .unwrap_err();
            assert!(matches!(err, AnalyzerError::InvalidConfiguration(_)));
        }
        assert!(engine().with_default_threshold(2.0).is_err());
    }

    #[test]
    fn test_context_pattern_beats_bare_digits() {
        let text = "ssn 123456789";
        let result = engine().analyze_text(text).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.entities[0].text, "123456789");
        assert_eq!(result.entities[0].score, 0.95);
    }

    #[test]
    fn test_failing_recognizer_is_isolated() {
        let mut registry = RecognizerRegistry::with_builtins("en").unwrap();
        registry.register(Failing);
        registry.register(Panicking);
        let engine = AnalyzerEngine::new(registry);

        let (tx, rx) = mpsc::channel();
        let result = engine
            .analyze_streaming(&AnalysisRequest::new("SSN: 123-45-6789, bob@example.com"), tx)
            .unwrap();

        assert_eq!(result.len(), 2);
        let failures: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                AnalysisEvent::RecognizerFailed { recognizer, .. } => Some(recognizer),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec!["Failing".to_string(), "Panicking".to_string()]);
    }

    #[test]
    fn test_malformed_candidates_rejected() {
        let mut registry = RecognizerRegistry::new("en");
        registry.register(OutOfBounds);
        let result = AnalyzerEngine::new(registry).analyze_text("short").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_entity_scope_restricts_recognizers() {
        let text = "alice@example.com 123-45-6789";
        let result = engine()
            .analyze(&AnalysisRequest::new(text).with_entity_types([US_SSN]))
            .unwrap();
        let types: Vec<&str> = result.entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec![US_SSN]);
    }

    #[test]
    fn test_surface_filter_applies_after_overlap() {
        // O SSN (0.95) vence o padrão de nove dígitos customizado mesmo não
        // sendo exibido: a região continua ocupada.
        let mut registry = RecognizerRegistry::with_builtins("en").unwrap();
        registry.register(PatternRecognizer::new(
            "Account",
            "ACCOUNT",
            vec![Pattern::new("acct", r"\b\d{9}\b", 0.5).unwrap()],
        ));
        let engine = AnalyzerEngine::new(registry);
        let request = AnalysisRequest::new("ssn: 123456789").with_surface_entity_types(["ACCOUNT"]);
        assert!(engine.analyze(&request).unwrap().is_empty());
    }

    #[test]
    fn test_streaming_ends_with_done() {
        let (tx, rx) = mpsc::channel();
        engine()
            .analyze_streaming(&AnalysisRequest::new("call 555-123-4567"), tx)
            .unwrap();
        let events: Vec<AnalysisEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(AnalysisEvent::RecognizerFinished { .. })));
        assert!(matches!(events.last(), Some(AnalysisEvent::Done { result, .. }) if result.len() == 1));
    }

    #[test]
    fn test_streaming_reports_threshold_drops() {
        let (tx, rx) = mpsc::channel();
        let request = AnalysisRequest::new("id 123456789").with_score_threshold(0.8);
        let result = engine().analyze_streaming(&request, tx).unwrap();
        assert!(result.is_empty());
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, AnalysisEvent::BelowThreshold { threshold, .. } if threshold == 0.8)));
    }

    #[test]
    fn test_batch_preserves_order() {
        let texts = ["bob@example.com", "", "123-45-6789"];
        let results = engine().analyze_batch(&texts, &AnalysisRequest::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().entities[0].entity_type, EMAIL_ADDRESS);
        assert!(results[1].as_ref().unwrap().is_empty());
        assert_eq!(results[2].as_ref().unwrap().entities[0].entity_type, US_SSN);
    }
}
