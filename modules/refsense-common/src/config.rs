use std::env;

/// Hard cap on posts per inbound request.
pub const MAX_POSTS_PER_REQUEST: usize = 40;

/// Nominal per-post content budget in chars. Platform-dependent actual
/// lengths may exceed this and get trimmed.
pub const POST_CHAR_BUDGET: usize = 280;

/// Application configuration loaded from environment variables once at
/// process startup. Business logic receives this by value, never reads the
/// environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,
    pub model: String,

    // Bibliographic lookup
    pub citoid_base_url: String,

    // Pipeline tuning
    pub batch_size: usize,
    pub max_attempts: u32,
    pub max_chars: usize,
    pub max_summary_len: i64,
    pub quoted_context_len: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            model: env::var("REFSENSE_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            citoid_base_url: env::var("CITOID_BASE_URL")
                .unwrap_or_else(|_| "https://en.wikipedia.org/api/rest_v1/data/citation".to_string()),
            batch_size: parsed_env("REFSENSE_BATCH_SIZE", 5),
            max_attempts: parsed_env("REFSENSE_MAX_ATTEMPTS", 5),
            max_chars: parsed_env("REFSENSE_MAX_CHARS", MAX_POSTS_PER_REQUEST * POST_CHAR_BUDGET),
            max_summary_len: parsed_env("REFSENSE_MAX_SUMMARY_LEN", 500),
            quoted_context_len: env::var("REFSENSE_QUOTED_CONTEXT_LEN")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            model: "claude-haiku-4-5-20251001".to_string(),
            citoid_base_url: "https://en.wikipedia.org/api/rest_v1/data/citation".to_string(),
            batch_size: 5,
            max_attempts: 5,
            max_chars: MAX_POSTS_PER_REQUEST * POST_CHAR_BUDGET,
            max_summary_len: 500,
            quoted_context_len: None,
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
