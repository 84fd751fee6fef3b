/// ISO 639-1 codes accepted as translation targets, with display names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("pt", "Português (BR)"),
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("ja", "日本語"),
    ("zh", "中文"),
    ("ru", "Русский"),
    ("ar", "العربية"),
    ("hi", "हिन्दी"),
    ("ko", "한국어"),
    ("nl", "Nederlands"),
    ("pl", "Polski"),
    ("sv", "Svenska"),
    ("tr", "Türkçe"),
    ("vi", "Tiếng Việt"),
    ("th", "ไทย"),
    ("cs", "Čeština"),
    ("da", "Dansk"),
    ("fi", "Suomi"),
    ("el", "Ελληνικά"),
    ("he", "עברית"),
    ("id", "Bahasa Indonesia"),
    ("no", "Norsk"),
    ("ro", "Română"),
    ("uk", "Українська"),
];

/// Source language meaning "let the translator detect it"
pub const AUTO_DETECT: &str = "auto";

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display name, or the upper-cased code when unknown
pub fn language_name(code: &str) -> String {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}

pub fn is_valid_source(code: &str) -> bool {
    code == AUTO_DETECT || is_supported(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert!(is_supported("pt"));
        assert!(is_supported("uk"));
        assert!(!is_supported("auto"));
        assert!(is_valid_source("auto"));
        assert_eq!(language_name("de"), "Deutsch");
        assert_eq!(language_name("xx"), "XX");
        assert_eq!(SUPPORTED_LANGUAGES.len(), 27);
    }
}
