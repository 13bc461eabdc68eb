use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::OrganizationType;

const MILITARY_KEYWORDS: &[&str] = &[
    "army",
    "navy",
    "air force",
    "space force",
    "marine corps",
    "marines",
    "coast guard",
    "national guard",
    "usmc",
    "usaf",
    "military",
    "armed forces",
];

const HBCU_KEYWORDS: &[&str] = &[
    "hbcu",
    "howard university",
    "spelman",
    "morehouse",
    "hampton university",
    "tuskegee",
    "florida a&m",
    "famu",
    "north carolina a&t",
    "ncat",
    "xavier university of louisiana",
    "fisk",
    "clark atlanta",
    "dillard",
    "grambling",
    "jackson state",
    "prairie view",
    "southern university",
    "morgan state",
    "bowie state",
    "coppin state",
    "delaware state",
    "tennessee state",
    "alabama state",
    "alabama a&m",
    "alcorn state",
    "norfolk state",
    "virginia state",
    "south carolina state",
    "winston-salem state",
    "fayetteville state",
    "elizabeth city state",
    "texas southern",
    "bethune-cookman",
    "claflin",
    "lincoln university",
];

const UNIVERSITY_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "institute of technology",
    "polytechnic",
    "academy",
    "school of",
];

const FOUNDATION_KEYWORDS: &[&str] = &["foundation", "fund", "endowment", "trust"];

fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    // Keyword tables are static, so the pattern always compiles
    Regex::new(&format!(r"\b(?:{})\b", alternation)).expect("keyword pattern")
}

/// Categories in priority order. HBCUs are checked before the generic
/// university keywords so "… State University" HBCUs keep their tag.
static CATEGORIES: Lazy<Vec<(OrganizationType, Regex)>> = Lazy::new(|| {
    vec![
        (OrganizationType::Military, keyword_pattern(MILITARY_KEYWORDS)),
        (OrganizationType::Hbcu, keyword_pattern(HBCU_KEYWORDS)),
        (OrganizationType::University, keyword_pattern(UNIVERSITY_KEYWORDS)),
        (OrganizationType::Foundation, keyword_pattern(FOUNDATION_KEYWORDS)),
    ]
});

/// Derive the organization type from its name. First matching category wins.
pub fn classify_organization(name: &str) -> OrganizationType {
    let lowered = name.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(org_type, _)| *org_type)
        .unwrap_or(OrganizationType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_military() {
        assert_eq!(classify_organization("U.S. Army Recruiting"), OrganizationType::Military);
        assert_eq!(classify_organization("Air Force ROTC"), OrganizationType::Military);
        assert_eq!(classify_organization("Navy College Program"), OrganizationType::Military);
    }

    #[test]
    fn test_hbcu_before_university() {
        assert_eq!(classify_organization("Howard University"), OrganizationType::Hbcu);
        assert_eq!(classify_organization("Jackson State University"), OrganizationType::Hbcu);
        assert_eq!(classify_organization("Spelman College"), OrganizationType::Hbcu);
        assert_eq!(classify_organization("Florida A&M University"), OrganizationType::Hbcu);
    }

    #[test]
    fn test_university_and_foundation() {
        assert_eq!(classify_organization("Arizona State University"), OrganizationType::University);
        assert_eq!(classify_organization("Miami Dade College"), OrganizationType::University);
        assert_eq!(classify_organization("Gates Foundation"), OrganizationType::Foundation);
    }

    #[test]
    fn test_default_and_word_boundaries() {
        assert_eq!(classify_organization("Acme Robotics"), OrganizationType::Other);
        // "army" inside another word must not count
        assert_eq!(classify_organization("Armyworm Research Labs"), OrganizationType::Other);
        assert_eq!(classify_organization("Trustworthy Tutors"), OrganizationType::Other);
    }
}
