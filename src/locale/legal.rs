// document-synthesis-service/src/locale/legal.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Language;

type LocalizedText = HashMap<String, String>;
type LocalizedList = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegalRecord {
    #[serde(default)]
    aliases: Vec<String>,
    regulation: LocalizedText,
    tax_credits: LocalizedText,
    co2_factor: f64,
    jobs_per_plant: u32,
    #[serde(default)]
    incentives: LocalizedList,
    #[serde(default)]
    sdg_alignment: Vec<String>,
}

/// Country legal and ESG reference data, resolved for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryLegalData {
    pub country_key: String,
    pub regulation: String,
    pub tax_credits: String,
    /// Tons of CO2e avoided per ton of tires processed.
    pub co2_factor: f64,
    pub jobs_per_plant: u32,
    pub incentives: Vec<String>,
    pub sdg_alignment: Vec<String>,
}

impl CountryLegalData {
    pub fn co2_avoided(&self, annual_tons: f64) -> f64 {
        annual_tons * self.co2_factor
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct LegalTable {
    default: LegalRecord,
    countries: HashMap<String, LegalRecord>,
}

impl LegalTable {
    pub(super) fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub(super) fn minimal() -> Self {
        Self {
            default: LegalRecord {
                aliases: Vec::new(),
                regulation: LocalizedText::new(),
                tax_credits: LocalizedText::new(),
                co2_factor: 0.75,
                jobs_per_plant: 35,
                incentives: LocalizedList::new(),
                sdg_alignment: Vec::new(),
            },
            countries: HashMap::new(),
        }
    }

    fn find(&self, country: &str) -> Option<(&str, &LegalRecord)> {
        let key = normalize_country(country);
        if key.is_empty() {
            return None;
        }
        if let Some((name, record)) = self.countries.get_key_value(&key) {
            return Some((name.as_str(), record));
        }
        self.countries
            .iter()
            .find(|(_, record)| record.aliases.iter().any(|a| normalize_country(a) == key))
            .map(|(name, record)| (name.as_str(), record))
    }

    pub(super) fn resolve(&self, country: &str, language: Language) -> CountryLegalData {
        let (key, record) = match self.find(country) {
            Some(found) => found,
            None => {
                warn!(country = %country, "No legal data for country, using default record");
                ("default", &self.default)
            }
        };
        debug!(country = %country, key = %key, "Resolved country legal data");

        CountryLegalData {
            country_key: key.to_string(),
            regulation: pick_text(&record.regulation, language),
            tax_credits: pick_text(&record.tax_credits, language),
            co2_factor: record.co2_factor,
            jobs_per_plant: record.jobs_per_plant,
            incentives: pick_list(&record.incentives, language),
            sdg_alignment: record.sdg_alignment.clone(),
        }
    }
}

fn pick_text(text: &LocalizedText, language: Language) -> String {
    text.get(language.code())
        .or_else(|| text.get(Language::DEFAULT.code()))
        .cloned()
        .unwrap_or_default()
}

fn pick_list(list: &LocalizedList, language: Language) -> Vec<String> {
    list.get(language.code())
        .or_else(|| list.get(Language::DEFAULT.code()))
        .cloned()
        .unwrap_or_default()
}

/// Lowercase, accent-folded, underscore-separated country key.
pub fn normalize_country(name: &str) -> String {
    let folded: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .collect();
    folded
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub(crate) fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}
