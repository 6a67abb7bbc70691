/// Supported interface languages, code to native name.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("pt", "Português"),
    ("nl", "Nederlands"),
    ("pl", "Polski"),
    ("ru", "Русский"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("zh", "中文"),
    ("ar", "العربية"),
    ("hi", "हिन्दी"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

pub fn language_name(code: &str) -> &str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Picks the best supported language from an Accept-Language header.
///
/// Entries are ranked by their q-value; region subtags are stripped
/// (`fr-CH` matches `fr`). Returns None when nothing matches.
pub fn detect_from_accept_language(header: &str) -> Option<&'static str> {
    let mut candidates: Vec<(f32, &str)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            let primary = tag.split('-').next()?;
            Some((q, primary))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    candidates.into_iter().find_map(|(_, primary)| {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|(code, _)| *code == primary)
            .map(|(code, _)| *code)
    })
}

/// Default tax treatment per country, keyed by uppercase ISO code.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaxRule {
    pub country: &'static str,
    pub rate: f64,
    pub tax_name: &'static str,
    pub calculation: &'static str,
}

pub const TAX_RULES: &[TaxRule] = &[
    TaxRule { country: "US", rate: 0.0, tax_name: "Sales Tax", calculation: "state_based" },
    TaxRule { country: "CA", rate: 0.05, tax_name: "GST/HST", calculation: "federal_provincial" },
    TaxRule { country: "GB", rate: 0.20, tax_name: "VAT", calculation: "standard" },
    TaxRule { country: "DE", rate: 0.19, tax_name: "MwSt", calculation: "standard" },
    TaxRule { country: "FR", rate: 0.20, tax_name: "TVA", calculation: "standard" },
    TaxRule { country: "ES", rate: 0.21, tax_name: "IVA", calculation: "standard" },
    TaxRule { country: "IT", rate: 0.22, tax_name: "IVA", calculation: "standard" },
    TaxRule { country: "JP", rate: 0.10, tax_name: "消費税", calculation: "standard" },
    TaxRule { country: "AU", rate: 0.10, tax_name: "GST", calculation: "standard" },
    TaxRule { country: "IN", rate: 0.18, tax_name: "GST", calculation: "standard" },
];

pub fn tax_rule_for_country(country: &str) -> Option<&'static TaxRule> {
    let code = country.to_uppercase();
    TAX_RULES.iter().find(|rule| rule.country == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fourteen_languages_are_supported() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 14);
        assert!(is_supported("en"));
        assert!(is_supported("hi"));
        assert!(!is_supported("xx"));
    }

    #[test]
    fn language_name_falls_back_to_code() {
        assert_eq!(language_name("de"), "Deutsch");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn detection_respects_q_values() {
        assert_eq!(
            detect_from_accept_language("fr-CH, fr;q=0.9, en;q=0.8"),
            Some("fr")
        );
        assert_eq!(
            detect_from_accept_language("da, en-GB;q=0.8, en;q=0.7"),
            Some("en")
        );
    }

    #[test]
    fn unsupported_languages_detect_nothing() {
        assert_eq!(detect_from_accept_language("da, sv;q=0.9"), None);
        assert_eq!(detect_from_accept_language(""), None);
    }

    #[test]
    fn region_subtags_are_stripped() {
        assert_eq!(detect_from_accept_language("pt-BR"), Some("pt"));
        assert_eq!(detect_from_accept_language("zh-Hans-CN"), Some("zh"));
    }

    #[test]
    fn tax_rules_match_case_insensitively() {
        let rule = tax_rule_for_country("de").unwrap();
        assert_eq!(rule.tax_name, "MwSt");
        assert_eq!(rule.rate, 0.19);
        assert!(tax_rule_for_country("XX").is_none());
    }
}
