//! Catalogue of languages the assistant knows how to name.
//!
//! The configured `languages.supported` set selects from this catalogue.

use serde::Serialize;

/// A language the assistant can detect, translate to, or answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    #[serde(rename = "nativeName")]
    pub native_name: &'static str,
}

/// Every language with a known display name.
pub const CATALOGUE: &[LanguageInfo] = &[
    LanguageInfo { code: "en", name: "English", native_name: "English" },
    LanguageInfo { code: "hi", name: "Hindi", native_name: "हिन्दी" },
    LanguageInfo { code: "raj", name: "Rajasthani", native_name: "राजस्थानी" },
    LanguageInfo { code: "gu", name: "Gujarati", native_name: "ગુજરાતી" },
    LanguageInfo { code: "mr", name: "Marathi", native_name: "मराठी" },
    LanguageInfo { code: "pa", name: "Punjabi", native_name: "ਪੰਜਾਬੀ" },
    LanguageInfo { code: "ta", name: "Tamil", native_name: "தமிழ்" },
    LanguageInfo { code: "bn", name: "Bengali", native_name: "বাংলা" },
    LanguageInfo { code: "te", name: "Telugu", native_name: "తెలుగు" },
    LanguageInfo { code: "kn", name: "Kannada", native_name: "ಕನ್ನಡ" },
    LanguageInfo { code: "ml", name: "Malayalam", native_name: "മലയാളം" },
    LanguageInfo { code: "or", name: "Odia", native_name: "ଓଡ଼ିଆ" },
];

/// Look up a language by code.
pub fn lookup(code: &str) -> Option<&'static LanguageInfo> {
    CATALOGUE.iter().find(|lang| lang.code == code)
}

/// English display name for `code`, or the code itself when unknown.
pub fn display_name(code: &str) -> &str {
    lookup(code).map(|lang| lang.name).unwrap_or(code)
}

/// Code understood by translation providers.
///
/// Rajasthani has no provider support and is served through Hindi.
pub fn provider_code(code: &str) -> &str {
    match code {
        "raj" => "hi",
        other => other,
    }
}
