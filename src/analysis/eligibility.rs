//! Country eligibility analysis
//!
//! Retrieval answers are free text; the verdict comes from a deterministic
//! scanner over that text. Explicit negation near a country mention wins,
//! explicit affirmation (direct, regional, or worldwide) comes second, and
//! anything hedged or absent stays `Uncertain`. `Uncertain` is a valid
//! outcome, not a failure.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::retrieval::QaEngine;
use crate::types::{Citation, EligibilityStatus, EligibilitySummary, EligibilityVerdict};

/// Canonical country names with the variations seen in policy wordings
const COUNTRY_ALIASES: &[(&str, &[&str])] = &[
    ("United States", &["usa", "us", "u.s.", "u.s.a.", "united states of america", "america"]),
    ("United Kingdom", &["uk", "great britain", "britain", "england"]),
    ("United Arab Emirates", &["uae", "emirates"]),
    ("Singapore", &["sg"]),
    ("Malaysia", &["my"]),
    ("Thailand", &["th"]),
    ("Indonesia", &["id"]),
    ("Philippines", &["ph"]),
    ("Vietnam", &["vn"]),
    ("Hong Kong", &["hk"]),
    ("Japan", &["jp"]),
    ("South Korea", &["korea", "kr"]),
    ("China", &["prc", "people's republic of china"]),
    ("India", &["in"]),
    ("Australia", &["au"]),
    ("New Zealand", &["nz"]),
    ("France", &[]),
    ("Germany", &[]),
    ("Italy", &[]),
    ("Spain", &[]),
    ("Switzerland", &[]),
    ("Netherlands", &[]),
    ("Canada", &["ca"]),
    ("Mexico", &[]),
    ("Brazil", &[]),
    ("South Africa", &[]),
    ("Saudi Arabia", &[]),
    ("Turkey", &["turkiye"]),
    ("Israel", &[]),
    ("Egypt", &[]),
];

/// Regions a policy may name instead of individual countries
const REGIONS: &[(&str, &[&str])] = &[
    (
        "asean",
        &[
            "singapore", "malaysia", "thailand", "indonesia", "philippines", "vietnam",
            "brunei", "myanmar", "cambodia", "laos",
        ],
    ),
    (
        "schengen",
        &[
            "france", "germany", "italy", "spain", "netherlands", "switzerland", "austria",
            "belgium", "portugal", "greece", "poland", "sweden", "norway", "denmark", "finland",
        ],
    ),
    (
        "europe",
        &[
            "france", "germany", "italy", "spain", "netherlands", "switzerland", "united kingdom",
            "austria", "belgium", "portugal", "greece", "poland", "sweden", "norway", "denmark",
            "finland", "ireland",
        ],
    ),
];

const GLOBAL_TERMS: &[&str] = &["worldwide", "world-wide", "globally", "all countries", "any destination"];

const NEGATION_MARKERS: &[&str] = &[
    "not covered",
    "no coverage",
    "not eligible",
    "excluded",
    "exclusion applies",
    "does not cover",
    "does not provide",
    "not included",
    "not available in",
    "cannot be used",
    "not applicable",
    "restricted",
];

const AFFIRMATION_MARKERS: &[&str] = &[
    "is covered",
    "are covered",
    "fully covered",
    "covered",
    "eligible",
    "included",
    "provides coverage",
    "provide coverage",
    "covers",
    "applies",
];

const HEDGE_MARKERS: &[&str] = &[
    "unclear",
    "cannot determine",
    "unable to determine",
    "not specified",
    "does not mention",
    "no information",
    "may or may not",
];

const INSUFFICIENT_MARKER: &str = "couldn't find relevant information";

/// How far around a mention the scanner looks for markers, in bytes
const SCAN_WINDOW: usize = 100;

/// All countries covered by a policy, extracted from a broad answer without
/// per-country verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveredCountries {
    pub policy_name: String,
    /// Countries (and "Worldwide" when applicable) named as covered
    pub countries: Vec<String>,
    /// The answer text the list was extracted from
    pub coverage_description: String,
    pub citations: Vec<Citation>,
}

/// Checks which countries a policy covers
pub struct EligibilityAnalyzer {
    qa: Arc<QaEngine>,
}

impl EligibilityAnalyzer {
    /// Create an analyzer over a QA engine
    pub fn new(qa: Arc<QaEngine>) -> Self {
        Self { qa }
    }

    /// Check whether one policy covers one country
    pub async fn check(&self, policy_name: &str, country: &str) -> Result<EligibilityVerdict> {
        let normalized = normalize_country(country);
        let scope = [policy_name.to_string()];

        let questions = [
            format!(
                "Does this policy provide coverage for trips to {}? List any exclusions or restrictions that apply.",
                normalized
            ),
            format!("Are there any geographic restrictions affecting {}?", normalized),
        ];

        let mut combined = String::new();
        let mut detail = String::new();
        let mut citations: Vec<Citation> = Vec::new();

        for question in &questions {
            let answer = self.qa.answer(question, Some(&scope)).await?;
            if detail.is_empty() {
                detail = answer.answer.clone();
            }
            for citation in answer.citations {
                if !citations.iter().any(|c| c.chunk_id == citation.chunk_id) {
                    citations.push(citation);
                }
            }
            combined.push_str(&answer.answer);
            combined.push(' ');
        }

        let status = classify_answer(&combined, &normalized);
        tracing::info!("eligibility for {} in '{}': {:?}", normalized, policy_name, status);

        Ok(EligibilityVerdict {
            policy_name: policy_name.to_string(),
            country: country.to_string(),
            country_normalized: normalized,
            status,
            detail,
            citations,
        })
    }

    /// Check many countries, folding the verdicts into a summary. A failure
    /// on one country is recorded as `Uncertain` and never aborts the rest.
    pub async fn check_many(&self, policy_name: &str, countries: &[String]) -> EligibilitySummary {
        let mut verdicts = Vec::with_capacity(countries.len());

        for country in countries {
            match self.check(policy_name, country).await {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => {
                    tracing::warn!("eligibility check failed for {} in '{}': {}", country, policy_name, e);
                    verdicts.push(EligibilityVerdict {
                        policy_name: policy_name.to_string(),
                        country: country.clone(),
                        country_normalized: normalize_country(country),
                        status: EligibilityStatus::Uncertain,
                        detail: format!("check failed: {}", e),
                        citations: Vec::new(),
                    });
                }
            }
        }

        EligibilitySummary::from_verdicts(policy_name.to_string(), verdicts)
    }

    /// Extract the full list of covered countries and regions from a broad
    /// retrieval answer, without verifying each one individually
    pub async fn covered_countries(&self, policy_name: &str) -> Result<CoveredCountries> {
        let scope = [policy_name.to_string()];
        let answer = self
            .qa
            .answer(
                "List all countries, regions, or geographic areas where this policy provides coverage. Also list any excluded countries or regions.",
                Some(&scope),
            )
            .await?;

        let countries = extract_countries(&answer.answer);

        Ok(CoveredCountries {
            policy_name: policy_name.to_string(),
            countries,
            coverage_description: answer.answer,
            citations: answer.citations,
        })
    }
}

/// Normalize a country name through the alias table
pub fn normalize_country(country: &str) -> String {
    let needle = country.trim().to_lowercase();
    for (canonical, aliases) in COUNTRY_ALIASES {
        if canonical.to_lowercase() == needle || aliases.iter().any(|a| *a == needle) {
            return (*canonical).to_string();
        }
    }
    title_case(country.trim())
}

/// Classify an answer about one country into an eligibility verdict.
///
/// Scanner order: insufficient-information short-circuit, then negation near
/// a country or matching-region mention, then hedging, then affirmation near
/// a mention (direct, regional, or worldwide). Anything else is `Uncertain`.
pub fn classify_answer(answer: &str, country_normalized: &str) -> EligibilityStatus {
    let text = answer.to_lowercase();
    if text.contains(INSUFFICIENT_MARKER) {
        return EligibilityStatus::Uncertain;
    }

    let country = country_normalized.to_lowercase();
    let mut terms: Vec<String> = vec![country.clone()];
    for (canonical, aliases) in COUNTRY_ALIASES {
        if canonical.to_lowercase() == country {
            // Two-letter codes ("us", "my", "in") collide with ordinary
            // English words; only longer aliases are scanned for.
            terms.extend(aliases.iter().filter(|a| a.len() >= 3).map(|a| a.to_string()));
        }
    }
    for (region, members) in REGIONS {
        if members.contains(&country.as_str()) {
            terms.push((*region).to_string());
        }
    }
    terms.extend(GLOBAL_TERMS.iter().map(|t| t.to_string()));

    let mut affirmed = false;
    for term in &terms {
        for window in mention_windows(&text, term) {
            if NEGATION_MARKERS.iter().any(|m| window.contains(m)) {
                return EligibilityStatus::NotEligible;
            }
            // "worldwide except X" excludes X even though the window affirms
            if GLOBAL_TERMS.contains(&term.as_str()) {
                if let Some(pos) = window.find("except") {
                    if window[pos..].contains(country.as_str()) {
                        return EligibilityStatus::NotEligible;
                    }
                }
            }
            if AFFIRMATION_MARKERS.iter().any(|m| window.contains(m)) {
                affirmed = true;
            }
        }
    }

    if HEDGE_MARKERS.iter().any(|m| text.contains(m)) {
        return EligibilityStatus::Uncertain;
    }

    if affirmed {
        EligibilityStatus::Eligible
    } else {
        EligibilityStatus::Uncertain
    }
}

/// Text windows around each whole-word occurrence of a term. Substring hits
/// inside larger words ("us" in "must") are ignored.
fn mention_windows<'a>(text: &'a str, term: &str) -> Vec<&'a str> {
    let mut windows = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(term) {
        let pos = search_from + rel;
        if is_word_bounded(text, pos, term.len()) {
            let start = clamp_to_char_boundary(text, pos.saturating_sub(SCAN_WINDOW), false);
            let end = clamp_to_char_boundary(text, (pos + term.len() + SCAN_WINDOW).min(text.len()), true);
            windows.push(&text[start..end]);
        }
        search_from = pos + term.len();
        if search_from >= text.len() {
            break;
        }
    }
    windows
}

fn contains_word(text: &str, term: &str) -> bool {
    !mention_windows(text, term).is_empty()
}

fn is_word_bounded(text: &str, pos: usize, len: usize) -> bool {
    let before_ok = pos == 0
        || !text[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric());
    let after_ok = pos + len >= text.len()
        || !text[pos + len..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric());
    before_ok && after_ok
}

fn clamp_to_char_boundary(text: &str, mut index: usize, forward: bool) -> usize {
    while index > 0 && index < text.len() && !text.is_char_boundary(index) {
        if forward {
            index += 1;
        } else {
            index -= 1;
        }
    }
    index.min(text.len())
}

/// Scan free text for known country names and worldwide markers
fn extract_countries(answer: &str) -> Vec<String> {
    let text = answer.to_lowercase();
    let mut found = Vec::new();

    if GLOBAL_TERMS.iter().any(|t| text.contains(t)) {
        found.push("Worldwide".to_string());
    }

    for (canonical, aliases) in COUNTRY_ALIASES {
        let canonical_lower = canonical.to_lowercase();
        // Short aliases like "us" are too noisy for free-text scanning;
        // only full names count here.
        if contains_word(&text, &canonical_lower)
            || aliases.iter().any(|a| a.len() > 4 && contains_word(&text, a))
        {
            found.push((*canonical).to_string());
        }
    }

    found
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_near_country_is_not_eligible() {
        let status = classify_answer("This plan is not covered for USA.", "United States");
        assert_eq!(status, EligibilityStatus::NotEligible);
    }

    #[test]
    fn explicit_exclusion_is_not_eligible() {
        let status = classify_answer(
            "Trips to North Korea are excluded from all benefits under this policy.",
            "North Korea",
        );
        assert_eq!(status, EligibilityStatus::NotEligible);
    }

    #[test]
    fn regional_affirmation_covers_member_countries() {
        let status = classify_answer(
            "The policy is fully covered across ASEAN countries during the trip period.",
            "Singapore",
        );
        assert_eq!(status, EligibilityStatus::Eligible);
    }

    #[test]
    fn direct_affirmation_is_eligible() {
        let status = classify_answer(
            "Yes, Japan is covered under the worldwide plan with a USD 100,000 medical limit.",
            "Japan",
        );
        assert_eq!(status, EligibilityStatus::Eligible);
    }

    #[test]
    fn worldwide_except_excludes_the_named_country() {
        let status = classify_answer(
            "Coverage is worldwide except united states and its territories.",
            "United States",
        );
        assert_eq!(status, EligibilityStatus::NotEligible);
    }

    #[test]
    fn worldwide_affirmation_covers_unnamed_countries() {
        let status = classify_answer(
            "The plan provides coverage worldwide for emergency medical expenses.",
            "Chile",
        );
        assert_eq!(status, EligibilityStatus::Eligible);
    }

    #[test]
    fn hedged_answer_is_uncertain() {
        let status = classify_answer(
            "The documents do not mention Brazil, so coverage there is unclear.",
            "Brazil",
        );
        assert_eq!(status, EligibilityStatus::Uncertain);
    }

    #[test]
    fn insufficient_information_is_uncertain() {
        let status = classify_answer(
            "I couldn't find relevant information in the policy documents to answer this question.",
            "Singapore",
        );
        assert_eq!(status, EligibilityStatus::Uncertain);
    }

    #[test]
    fn unrelated_answer_is_uncertain() {
        let status = classify_answer("Baggage loss is limited to USD 3,000 per trip.", "France");
        assert_eq!(status, EligibilityStatus::Uncertain);
    }

    #[test]
    fn country_aliases_normalize() {
        assert_eq!(normalize_country("usa"), "United States");
        assert_eq!(normalize_country("UK"), "United Kingdom");
        assert_eq!(normalize_country("singapore"), "Singapore");
        assert_eq!(normalize_country("atlantis"), "Atlantis");
    }

    #[test]
    fn extract_countries_finds_names_and_worldwide() {
        let countries = extract_countries(
            "The policy covers Singapore, Malaysia and Thailand, with worldwide emergency evacuation.",
        );
        assert!(countries.contains(&"Worldwide".to_string()));
        assert!(countries.contains(&"Singapore".to_string()));
        assert!(countries.contains(&"Malaysia".to_string()));
        assert!(countries.contains(&"Thailand".to_string()));
    }
}
