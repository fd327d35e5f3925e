// src/validation.rs
//! Validação da forma dos pedidos. Os erros são agrupados por campo e
//! devolvidos em `details.fieldErrors` na resposta 400.

use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex de e-mail válida");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &'static str, message: impl Into<String>) -> &mut Self {
        self.errors.entry(field).or_default().push(message.into());
        self
    }

    /// Não apara o valor: quem chama decide (senhas contam espaços).
    pub fn min_len(&mut self, field: &'static str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            let message = if min <= 1 {
                "Campo obrigatório".to_string()
            } else {
                format!("Deve ter pelo menos {} caracteres", min)
            };
            self.error(field, message);
        }
        self
    }

    pub fn email(&mut self, field: &'static str, value: &str) -> &mut Self {
        if !is_valid_email(value.trim()) {
            self.error(field, "E-mail inválido");
        }
        self
    }

    pub fn min_value(&mut self, field: &'static str, value: i64, min: i64) -> &mut Self {
        if value < min {
            self.error(field, format!("Deve ser um inteiro >= {}", min));
        }
        self
    }

    pub fn finish(&self) -> AppResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(AppError::Validation {
            message: "Invalid body".to_string(),
            details: Some(json!({ "fieldErrors": self.errors })),
        })
    }
}
