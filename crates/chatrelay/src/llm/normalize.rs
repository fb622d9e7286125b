//! Upstream response normalization.

use serde_json::{Value, json};
use tracing::{info, warn};

use super::types::UpstreamResponse;

/// Appended to upstream "Incorrect API key" error messages.
pub const KEY_TROUBLESHOOTING: &str = "\n\nTroubleshooting:\n\
- Verify your API key is correct\n\
- Check if it's a service account key (starts with sk-svcacct-)\n\
- Ensure the key has proper permissions\n\
- Try generating a new API key";

const INCORRECT_KEY_MARKER: &str = "Incorrect API key";

/// Turn a raw upstream response into the JSON body returned to the client.
///
/// JSON bodies pass through unchanged, except that a failed response whose
/// `error.message` mentions an incorrect key gets [`KEY_TROUBLESHOOTING`]
/// appended. Non-JSON bodies are wrapped as `{"raw": <text>}`. The caller keeps
/// the upstream status either way.
pub fn normalize(response: &UpstreamResponse) -> Value {
    info!(status = response.status.as_u16(), "Upstream responded");

    let Some(mut body) = response.parsed() else {
        return json!({ "raw": response.body });
    };

    if !response.is_success() {
        warn!(status = response.status.as_u16(), error = %body, "Upstream returned an error");
        augment_key_error(&mut body);
    }

    body
}

fn augment_key_error(body: &mut Value) {
    if let Some(Value::String(message)) = body.pointer_mut("/error/message")
        && message.contains(INCORRECT_KEY_MARKER)
    {
        message.push_str(KEY_TROUBLESHOOTING);
    }
}
