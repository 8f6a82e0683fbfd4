// document-synthesis-service/src/locale/mod.rs

//! Language tables and country reference data.
//!
//! All strings live in `locales/*.json` and are embedded at compile time. Each
//! bundle is completed with the default language at load, so a key missing in
//! one translation renders in English; a key missing everywhere renders as the
//! key itself.

mod legal;

pub use legal::{normalize_country, CountryLegalData};
pub(crate) use legal::fold_accent;

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{DocumentError, Result};
use legal::LegalTable;

static TABLE: Lazy<LocalizationTable> = Lazy::new(LocalizationTable::load);

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
});

const SOURCES: [(Language, &str); 5] = [
    (Language::En, include_str!("../../locales/en.json")),
    (Language::Pt, include_str!("../../locales/pt.json")),
    (Language::Es, include_str!("../../locales/es.json")),
    (Language::Zh, include_str!("../../locales/zh.json")),
    (Language::It, include_str!("../../locales/it.json")),
];

const LEGAL_SOURCE: &str = include_str!("../../locales/legal.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Pt,
    Es,
    Zh,
    It,
}

impl Language {
    pub const DEFAULT: Language = Language::En;
    pub const ALL: [Language; 5] = [Language::En, Language::Pt, Language::Es, Language::Zh, Language::It];

    /// Strict parse; accepts region suffixes such as `pt-BR` or `zh_CN`.
    pub fn parse(code: &str) -> Result<Self> {
        let primary = code
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Language::En),
            "pt" => Ok(Language::Pt),
            "es" => Ok(Language::Es),
            "zh" => Ok(Language::Zh),
            "it" => Ok(Language::It),
            _ => Err(DocumentError::UnsupportedLanguage(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pt => "pt",
            Language::Es => "es",
            Language::Zh => "zh",
            Language::It => "it",
        }
    }

    fn index(&self) -> usize {
        match self {
            Language::En => 0,
            Language::Pt => 1,
            Language::Es => 2,
            Language::Zh => 3,
            Language::It => 4,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Read-only strings of one language.
#[derive(Debug, Clone)]
pub struct LocaleBundle {
    language: Language,
    strings: HashMap<String, String>,
}

impl LocaleBundle {
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    pub fn text(&self, key: &str) -> String {
        match self.strings.get(key) {
            Some(text) => text.clone(),
            None => {
                warn!(key = %key, language = %self.language, "Missing localization key");
                key.to_string()
            }
        }
    }

    /// Fills `{{placeholders}}` in the string stored under `key`.
    pub fn render(&self, key: &str, data: &serde_json::Value) -> String {
        let template = self.text(key);
        match TEMPLATES.render_template(&template, data) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to render localized template");
                template
            }
        }
    }

    /// `prefix.1`, `prefix.2`, ... up to the first missing index.
    pub fn list(&self, prefix: &str) -> Vec<String> {
        (1..)
            .map(|i| format!("{prefix}.{i}"))
            .map_while(|key| self.strings.get(&key).cloned())
            .collect()
    }

    pub fn format_number(&self, value: f64, decimals: usize) -> String {
        let thousands = self.separator("_number.thousands", ",");
        let decimal = self.separator("_number.decimal", ".");
        group_digits(value, decimals, &thousands, &decimal)
    }

    pub fn format_currency(&self, value: f64, currency: &str) -> String {
        format!("{} {}", currency, self.format_number(value, 0))
    }

    pub fn format_percent(&self, value: f64, decimals: usize) -> String {
        format!("{}%", self.format_number(value, decimals))
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        let pattern = self.separator("_date.format", "%Y-%m-%d");
        date.format(&pattern).to_string()
    }

    fn separator(&self, key: &str, fallback: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

fn group_digits(value: f64, decimals: usize, thousands: &str, decimal: &str) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted.clone(), None),
    };

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * thousands.len());
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(thousands);
        }
        grouped.push(*c);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    match fraction {
        Some(f) => format!("{sign}{grouped}{decimal}{f}"),
        None => format!("{sign}{grouped}"),
    }
}

pub struct LocalizationTable {
    bundles: Vec<LocaleBundle>,
    legal: LegalTable,
}

impl LocalizationTable {
    /// Process-wide table, parsed on first use.
    pub fn global() -> &'static LocalizationTable {
        &TABLE
    }

    fn load() -> Self {
        let parsed: Vec<(Language, HashMap<String, String>)> = SOURCES
            .iter()
            .map(|(language, json)| {
                let strings = serde_json::from_str(json).unwrap_or_else(|e| {
                    error!(language = %language, error = %e, "Failed to parse locale table");
                    HashMap::new()
                });
                (*language, strings)
            })
            .collect();

        let defaults = parsed
            .iter()
            .find(|(language, _)| *language == Language::DEFAULT)
            .map(|(_, strings)| strings.clone())
            .unwrap_or_default();

        let bundles = parsed
            .into_iter()
            .map(|(language, mut strings)| {
                for (key, value) in &defaults {
                    if !strings.contains_key(key) {
                        debug!(key = %key, language = %language, "Filling key from default language");
                        strings.insert(key.clone(), value.clone());
                    }
                }
                LocaleBundle { language, strings }
            })
            .collect();

        let legal = LegalTable::parse(LEGAL_SOURCE).unwrap_or_else(|e| {
            error!(error = %e, "Failed to parse legal reference table");
            LegalTable::minimal()
        });

        Self { bundles, legal }
    }

    pub fn bundle(&self, language: Language) -> &LocaleBundle {
        &self.bundles[language.index()]
    }

    /// Lenient lookup: unknown codes get the `fallback` bundle.
    pub fn get(&self, language_code: &str, fallback: Language) -> &LocaleBundle {
        match Language::parse(language_code) {
            Ok(language) => self.bundle(language),
            Err(_) => {
                warn!(
                    language = %language_code,
                    fallback = %fallback,
                    "Unsupported language, falling back to default bundle"
                );
                self.bundle(fallback)
            }
        }
    }

    pub fn country_legal_data(&self, country: &str, language: Language) -> CountryLegalData {
        self.legal.resolve(country, language)
    }
}
