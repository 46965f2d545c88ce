use chadgpt_agent::ProviderError;

/// The single channel line reporting a failed completion.
pub fn error_notice(sender: &str, backend: &str, error: &ProviderError) -> String {
    format!("{sender}: {backend} error: {}", error.backend_message())
}
