//! `pii-analyze`: analisa um texto e imprime o relatório JSON no stdout.
//!
//! ```text
//! pii-analyze "SSN: 123-45-6789"
//! {"has_pii":true,"entities":[{"type":"US_SSN","text":"123-45-6789","score":0.95}]}
//! ```
//!
//! Com `--stdin`, cada linha da entrada é um texto e cada linha da saída é o
//! relatório correspondente. Logs vão para o stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pii_core::entity::BUILTIN_ENTITY_TYPES;
use pii_core::{AnalysisRequest, AnalyzerConfig, AnalyzerEngine, EntityFields};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Saída 1: entrada ausente. Saída 2: configuração inválida.
const EXIT_NO_INPUT: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "pii-analyze", version, about = "Detecta PII em texto e imprime JSON")]
struct Cli {
    /// Texto a analisar
    text: Option<String>,

    /// Arquivo TOML de configuração
    #[arg(long, env = "PII_CONFIG")]
    config: Option<PathBuf>,

    /// Limiar de score em [0, 1]
    #[arg(long)]
    threshold: Option<f64>,

    /// Tipos a detectar, separados por vírgula
    #[arg(long, value_delimiter = ',')]
    entities: Option<Vec<String>>,

    /// Inclui start/end de cada entidade
    #[arg(long)]
    offsets: bool,

    /// Lê um texto por linha do stdin (exclui TEXT)
    #[arg(long, conflicts_with = "text")]
    stdin: bool,

    /// Filtro de log (sintaxe do EnvFilter)
    #[arg(long, env = "PII_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn fields(&self) -> EntityFields {
        if self.offsets {
            EntityFields::Full
        } else {
            EntityFields::Text
        }
    }

    /// Requisição-modelo. Sem `--entities` nem `entity_types` na
    /// configuração, o escopo são os quatro tipos embutidos.
    fn template(&self, config: &AnalyzerConfig) -> AnalysisRequest {
        let entity_types = match (&self.entities, &config.entity_types) {
            (Some(types), _) => Some(types.clone()),
            (None, Some(_)) => None,
            (None, None) => Some(BUILTIN_ENTITY_TYPES.iter().map(|t| t.to_string()).collect()),
        };
        AnalysisRequest {
            entity_types,
            score_threshold: self.threshold,
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if cli.text.is_none() && !cli.stdin {
        print_json(&json!({"error": "No text provided"}));
        return ExitCode::from(EXIT_NO_INPUT);
    }

    let (config, engine) = match build(&cli) {
        Ok(built) => built,
        Err(err) => {
            print_json(&json!({"error": format!("{err:#}")}));
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let template = cli.template(&config);

    let outcome = match &cli.text {
        Some(text) => analyze_one(&engine, text, &template, cli.fields()),
        None => analyze_lines(&engine, &template, cli.fields()),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            print_json(&json!({"error": format!("{err:#}")}));
            ExitCode::FAILURE
        }
    }
}

fn build(cli: &Cli) -> anyhow::Result<(AnalyzerConfig, AnalyzerEngine)> {
    let config = AnalyzerConfig::load_or_default(cli.config.as_deref())
        .context("invalid configuration")?;
    let engine = config.build_engine().context("failed to build analyzer")?;
    Ok((config, engine))
}

fn analyze_one(
    engine: &AnalyzerEngine,
    text: &str,
    template: &AnalysisRequest,
    fields: EntityFields,
) -> anyhow::Result<ExitCode> {
    let request = AnalysisRequest {
        text: text.to_string(),
        ..template.clone()
    };
    match engine.analyze(&request) {
        Ok(result) => {
            print_json(&result.report(fields));
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_client_error() => {
            print_json(&json!({"error": err.to_string()}));
            Ok(ExitCode::from(EXIT_CONFIG))
        }
        Err(err) => Err(err.into()),
    }
}

/// Lê todas as linhas, analisa em paralelo e escreve na ordem de entrada.
fn analyze_lines(
    engine: &AnalyzerEngine,
    template: &AnalysisRequest,
    fields: EntityFields,
) -> anyhow::Result<ExitCode> {
    let lines: Vec<String> = io::stdin()
        .lock()
        .lines()
        .collect::<Result<_, _>>()
        .context("failed to read stdin")?;
    debug!(lines = lines.len(), "Analisando lote");

    let mut code = ExitCode::SUCCESS;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for result in engine.analyze_batch(&lines, template) {
        let value = match result {
            Ok(result) => serde_json::to_value(result.report(fields))?,
            Err(err) => {
                code = ExitCode::from(EXIT_CONFIG);
                json!({"error": err.to_string()})
            }
        };
        writeln!(out, "{value}")?;
    }
    Ok(code)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => eprintln!("failed to serialize output: {err}"),
    }
}
