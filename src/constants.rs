//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Estimate retry constants
pub mod retry {
    /// Total attempts against the provider, including the first call
    pub const MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 2_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Upper bound on a single backoff sleep (seconds)
    pub const MAX_DELAY_SECS: u64 = 60;
}

/// Generation parameters sent with every estimate request
pub mod generation {
    pub const TEMPERATURE: f32 = 1.0;
    pub const TOP_P: f32 = 0.95;
    pub const TOP_K: u32 = 40;
    pub const MAX_OUTPUT_TOKENS: u32 = 2048;

    /// MIME type requesting JSON-only output
    pub const RESPONSE_MIME_TYPE: &str = "application/json";
}

/// LLM provider constants
pub mod provider {
    /// Default provider name
    pub const DEFAULT_PROVIDER: &str = "gemini";

    /// Default flash-tier model
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

    /// Default Generative Language API base URL
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Provider HTTP request timeout per attempt (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    /// Overall estimate deadline across all attempts and backoff sleeps (seconds)
    pub const ESTIMATE_DEADLINE_SECS: u64 = 25;

    /// Environment variable holding the provider credential
    pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

    /// Environment variable overriding the model identifier
    pub const MODEL_ENV: &str = "GEMINI_MODEL";
}

/// Ticket assembly constants
pub mod ticket {
    /// Hex characters kept from the task hash for `ticket_id`
    pub const ID_HEX_LEN: usize = 16;

    /// Prefix of human-facing ticket numbers
    pub const NUMBER_PREFIX: &str = "TKT-";

    /// Random characters after the prefix
    pub const NUMBER_LEN: usize = 8;

    /// Words kept when deriving a title from the task text
    pub const TITLE_MAX_WORDS: usize = 6;

    /// Minimum words for a model-provided title to be accepted
    pub const TITLE_MIN_WORDS: usize = 3;

    /// Title used when the task text is empty
    pub const DEFAULT_TITLE: &str = "New Ticket";
}

/// Fallback estimate constants
pub mod fallback {
    /// Error note used when the caller supplies none
    pub const DEFAULT_ERROR: &str = "AI service temporarily unavailable";

    /// Task characters quoted in the fallback title
    pub const TITLE_TASK_CHARS: usize = 40;

    /// Task characters quoted in the fallback reasoning overview
    pub const REASONING_TASK_CHARS: usize = 100;
}

/// Tracker constants
pub mod tracker {
    /// Progress assigned when a ticket first enters `in_progress` with no progress
    pub const INITIAL_IN_PROGRESS: u8 = 10;

    /// Progress weight credited to tickets in review
    pub const REVIEW_WEIGHT: u8 = 90;

    /// Number of months covered by historical statistics
    pub const HISTORY_MONTHS: i64 = 6;

    /// Days per historical bucket step
    pub const HISTORY_STEP_DAYS: i64 = 30;
}

/// HTTP server constants
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 5000;

    /// Per-request timeout (seconds); must exceed the estimate deadline
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Maximum accepted request body (16 MiB)
    pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

    pub const SERVICE_NAME: &str = "kanban-estimator";
}

/// Storage constants
pub mod storage {
    pub const DEFAULT_DATABASE_PATH: &str = "kanban_tickets.db";
}
