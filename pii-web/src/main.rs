//! Ponto de entrada do serviço de PII.
//!
//! A configuração vem de `PII_CONFIG` (arquivo TOML, opcional) e das
//! variáveis `PII_*`. Se o motor não puder ser montado (por exemplo, o modelo
//! NLP não carrega) o processo termina antes de abrir a porta: o serviço
//! nunca aceita tráfego sem capacidade de detecção.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use pii_core::AnalyzerConfig;
use pii_web::{app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var_os("PII_CONFIG").map(PathBuf::from);
    let config = AnalyzerConfig::load_or_default(config_path.as_deref())
        .context("falha ao carregar a configuração")?;

    info!("Carregando reconhecedores e modelo NLP...");
    let engine = config.build_engine().context("falha ao montar o motor de análise")?;
    info!(
        recognizers = engine.registry().len(),
        entities = ?engine.registry().supported_entities(),
        "Analisador pronto"
    );

    let state = AppState::new(engine);
    let router = app(state, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("falha ao abrir {}", config.bind_addr))?;
    info!("🚀 Serviço PII iniciado em http://{}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("servidor encerrado com erro")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Sinal de parada recebido, encerrando");
    }
}
