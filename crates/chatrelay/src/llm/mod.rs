//! Provider dispatch: key validation, provider selection, upstream calls and
//! response normalization.

mod error;
mod keys;
mod normalize;
mod openai;
mod provider;
mod selector;
mod types;

pub use error::{InvalidRequest, SelectionError, UpstreamError};
pub use keys::{
    GROQ_KEYS_URL, KeyStatus, OPENAI_KEYS_URL, ProviderCredentials, key_type, validate_keys,
};
pub use normalize::{KEY_TROUBLESHOOTING, normalize};
pub use openai::{Endpoints, HttpUpstream};
pub use provider::{
    GROQ_BASE_URL, OPENAI_BASE_URL, Provider, ProviderPreference, Upstream, is_openai_model,
};
pub use selector::select_provider;
pub use types::{ChatRequest, CompletionBody, Message, Role, UpstreamResponse};
