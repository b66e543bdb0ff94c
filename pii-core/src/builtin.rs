//! # Reconhecedores Embutidos — Padrões de PII
//!
//! Conjunto padrão de reconhecedores baseados em regex para o idioma `en`.
//!
//! ## Por que vários padrões por tipo?
//!
//! Um SSN aparece de formas diferentes no texto livre, e cada forma merece uma
//! confiança diferente:
//!
//! | Padrão              | Exemplo                 | Score |
//! |---------------------|-------------------------|-------|
//! | `ssn_with_dashes`   | 123-45-6789             | 0.90  |
//! | `ssn_with_spaces`   | 123 45 6789             | 0.90  |
//! | `ssn_no_separators` | 123456789               | 0.70  |
//! | `ssn_with_context`  | SSN: 123-45-6789        | 0.95  |
//!
//! Nove dígitos soltos são ambíguos (podem ser qualquer número), por isso o
//! score menor: o filtro de limiar decide se entram no resultado. O padrão de
//! contexto captura apenas os dígitos, a palavra-chave só justifica o score.
//!
//! Cartões de crédito e e-mails passam por validadores: o match que passa na
//! checagem sobe para 1.0 e o que falha é descartado.

use crate::entity::{CREDIT_CARD, EMAIL_ADDRESS, PHONE_NUMBER, US_SSN};
use crate::error::Result;
use crate::pattern::Pattern;
use crate::recognizer::PatternRecognizer;

/// Todos os reconhecedores embutidos, na ordem de registro.
pub fn builtin_recognizers() -> Result<Vec<PatternRecognizer>> {
    Ok(vec![
        email_recognizer()?,
        phone_recognizer()?,
        ssn_recognizer()?,
        credit_card_recognizer()?,
    ])
}

pub fn email_recognizer() -> Result<PatternRecognizer> {
    let patterns = vec![Pattern::new(
        "email",
        r"\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
        0.5,
    )?];
    Ok(PatternRecognizer::new("EmailRecognizer", EMAIL_ADDRESS, patterns).with_validator(is_email))
}

pub fn phone_recognizer() -> Result<PatternRecognizer> {
    let patterns = vec![
        Pattern::new(
            "phone_us_formatted",
            r"(?:\+1[-.\s]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b",
            0.6,
        )?,
        Pattern::new(
            "phone_international",
            r"\+[1-9]\d{0,2}[-.\s]?(?:\d[-.\s]?){6,12}\d\b",
            0.5,
        )?,
    ];
    Ok(PatternRecognizer::new("PhoneRecognizer", PHONE_NUMBER, patterns))
}

pub fn ssn_recognizer() -> Result<PatternRecognizer> {
    let patterns = vec![
        Pattern::new("ssn_with_dashes", r"\b\d{3}-\d{2}-\d{4}\b", 0.9)?,
        Pattern::new("ssn_with_spaces", r"\b\d{3}\s\d{2}\s\d{4}\b", 0.9)?,
        Pattern::new("ssn_no_separators", r"\b\d{9}\b", 0.7)?,
        Pattern::new(
            "ssn_with_context",
            r"\b(?:ssn|social security number|social security|ss#)[\s:=]+(\d{3}[-\s]?\d{2}[-\s]?\d{4})\b",
            0.95,
        )?,
    ];
    Ok(PatternRecognizer::new("SsnRecognizer", US_SSN, patterns))
}

pub fn credit_card_recognizer() -> Result<PatternRecognizer> {
    let patterns = vec![Pattern::new(
        "credit_card",
        r"\b(?:4\d{3}|5[0-5]\d{2}|6\d{3}|1\d{3}|3\d{3})[- ]?\d{3,4}[- ]?\d{3,4}[- ]?\d{3,5}\b",
        0.3,
    )?];
    Ok(PatternRecognizer::new("CreditCardRecognizer", CREDIT_CARD, patterns).with_validator(luhn_checksum))
}

/// Verifica o dígito de controle de Luhn (separadores `-` e espaço são ignorados).
pub fn luhn_checksum(number: &str) -> bool {
    let digits: Vec<u32> = number
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
        .unwrap_or_default();

    if digits.len() < 12 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Checagem estrutural de um e-mail já casado pela regex.
fn is_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    if labels
        .iter()
        .any(|l| l.is_empty() || l.starts_with('-') || l.ends_with('-'))
    {
        return false;
    }
    labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}
