//! Credential validation.
//!
//! Keys are only checked syntactically (prefix and placeholder checks); no
//! network call is made here.

use std::fmt;

pub const GROQ_KEY_PREFIX: &str = "gsk_";
pub const OPENAI_KEY_PREFIX: &str = "sk-";
pub const SERVICE_ACCOUNT_PREFIX: &str = "sk-svcacct-";

pub const GROQ_KEYS_URL: &str = "https://console.groq.com/keys";
pub const OPENAI_KEYS_URL: &str = "https://platform.openai.com/api-keys";

/// Sample values shipped in setup docs that must never count as real keys.
const GROQ_PLACEHOLDERS: &[&str] = &[
    "gsk_your_actual_api_key_here",
    "your_actual_groq_api_key_here",
];

/// Provider API keys, resolved once at startup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl ProviderCredentials {
    pub fn new(groq_api_key: Option<String>, openai_api_key: Option<String>) -> Self {
        Self {
            groq_api_key,
            openai_api_key,
        }
    }

    pub fn key_status(&self) -> KeyStatus {
        validate_keys(self.groq_api_key.as_deref(), self.openai_api_key.as_deref())
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() { "<redacted>" } else { "<unset>" }
        }
        f.debug_struct("ProviderCredentials")
            .field("groq_api_key", &redact(&self.groq_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .finish()
    }
}

/// Which providers have a syntactically usable key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStatus {
    pub has_groq: bool,
    pub has_openai: bool,
}

impl KeyStatus {
    pub fn any(&self) -> bool {
        self.has_groq || self.has_openai
    }
}

pub fn validate_keys(groq_api_key: Option<&str>, openai_api_key: Option<&str>) -> KeyStatus {
    KeyStatus {
        has_groq: groq_api_key.is_some_and(is_valid_groq_key),
        has_openai: openai_api_key.is_some_and(is_valid_openai_key),
    }
}

pub fn is_valid_groq_key(key: &str) -> bool {
    !GROQ_PLACEHOLDERS.contains(&key) && key.starts_with(GROQ_KEY_PREFIX)
}

pub fn is_valid_openai_key(key: &str) -> bool {
    key.starts_with(OPENAI_KEY_PREFIX)
}

/// Human-readable OpenAI key kind, as reported by the key test route.
pub fn key_type(openai_api_key: &str) -> &'static str {
    if openai_api_key.starts_with(SERVICE_ACCOUNT_PREFIX) {
        "Service Account"
    } else {
        "Regular"
    }
}
