//! Structured analysis built on the retrieval substrate

mod comparison;
mod eligibility;

pub use comparison::{PolicyComparator, DEFAULT_CATEGORIES};
pub use eligibility::{classify_answer, CoveredCountries, EligibilityAnalyzer};
