//! Provider selection.
//!
//! Rules, first match wins:
//!
//! 1. `openai` requested: OpenAI, and only OpenAI.
//! 2. `auto` with an OpenAI key and no Groq key: OpenAI.
//! 3. `groq` requested, or `auto` with a Groq key: Groq.
//! 4. Model name contains `gpt-` or `o1-`: OpenAI.
//! 5. Otherwise Groq.
//!
//! In auto mode OpenAI only wins when Groq is entirely absent, even for OpenAI
//! model names.

use super::error::SelectionError;
use super::keys::KeyStatus;
use super::provider::{Provider, ProviderPreference, is_openai_model};

pub fn select_provider(
    preference: &ProviderPreference,
    model: &str,
    keys: KeyStatus,
) -> Result<Provider, SelectionError> {
    let wants_openai = match preference {
        ProviderPreference::OpenAI => {
            return if keys.has_openai {
                Ok(Provider::OpenAI)
            } else {
                Err(SelectionError::NoKeyForProvider(Provider::OpenAI))
            };
        }
        ProviderPreference::Auto if keys.has_openai && !keys.has_groq => true,
        ProviderPreference::Groq => false,
        ProviderPreference::Auto if keys.has_groq => false,
        _ => is_openai_model(model),
    };

    if wants_openai && keys.has_openai {
        Ok(Provider::OpenAI)
    } else if keys.has_groq {
        Ok(Provider::Groq)
    } else {
        Err(SelectionError::NoKeyForProvider(Provider::Groq))
    }
}
