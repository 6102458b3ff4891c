use serde::Serialize;

/// Response language the backend is asked to answer in.
///
/// Serialized as the two-letter code the `/chat` endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ne,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ne => "ne",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "en" => Some(Language::En),
            "ne" => Some(Language::Ne),
            _ => None,
        }
    }

    pub fn all() -> Vec<Language> {
        vec![Language::En, Language::Ne]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ne => "Nepali",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for lang in Language::all() {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Language::from_code("EN"), Some(Language::En));
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn serializes_as_wire_code() {
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), "\"en\"");
        assert_eq!(serde_json::to_string(&Language::Ne).unwrap(), "\"ne\"");
    }
}
