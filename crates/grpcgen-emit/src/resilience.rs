//! Resilience policy for generated service clients.
//!
//! The generated TypeScript wraps every RPC call with bounded retry and a
//! reconnect-on-failure layer. The policy itself — pattern sets, attempt
//! limit, backoff — lives here as pure functions so it can be unit tested
//! and embedded into the emitted code from one definition.
//!
//! Pattern matching is an ordered token scan over the lowercased error
//! message (details/message/data, whichever the runtime filled), which is
//! how the emitted `/token.+token/` regexes behave at runtime.

/// Total call attempts, including the first one.
pub const MAX_ATTEMPTS: u32 = 3;
/// Fixed delay between retry attempts.
pub const RETRY_BACKOFF_MS: u64 = 25;

/// Transient failures: safe to retry the same call.
const TRANSIENT_PATTERNS: &[&[&str]] = &[
    &["failed", "connect"],
    &["deadline", "exceeded"],
    &["tcp", "read", "failed"],
    &["internal", "http2", "error"],
    &["stream", "removed"],
];

/// Failures that additionally poison the long-lived client singleton.
/// The reconnect set is the transient set plus these.
const RECONNECT_ONLY_PATTERNS: &[&[&str]] = &[&["cannot", "read", "property"]];

fn matches(message: &str, tokens: &[&str]) -> bool {
    let message = message.to_lowercase();
    let mut rest = message.as_str();
    for token in tokens {
        match rest.find(token) {
            Some(at) => rest = &rest[at + token.len()..],
            None => return false,
        }
    }
    true
}

/// Does this error message match the transient (retry) pattern set?
pub fn is_transient(message: &str) -> bool {
    TRANSIENT_PATTERNS.iter().any(|p| matches(message, p))
}

/// Does this error message require rebuilding the client singleton?
/// Strict superset of [`is_transient`].
pub fn should_reconnect(message: &str) -> bool {
    is_transient(message) || RECONNECT_ONLY_PATTERNS.iter().any(|p| matches(message, p))
}

/// JS regex literals for the transient set, e.g. `/tcp.+read.+failed/`.
pub fn transient_js_regexes() -> String {
    js_regexes(TRANSIENT_PATTERNS.iter())
}

/// JS regex literals for the reconnect set.
pub fn reconnect_js_regexes() -> String {
    js_regexes(TRANSIENT_PATTERNS.iter().chain(RECONNECT_ONLY_PATTERNS))
}

fn js_regexes<'a>(patterns: impl Iterator<Item = &'a &'a [&'a str]>) -> String {
    patterns
        .map(|tokens| format!("/{}/", tokens.join(".+")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the retry loop does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry { backoff_ms: u64 },
    GiveUp,
}

/// Attempt counter local to one logical call. Mirrors the loop the
/// emitted wrapper runs: retry only transient failures, at most
/// [`MAX_ATTEMPTS`] attempts total.
#[derive(Debug)]
pub struct RetrySchedule {
    attempts: u32,
}

impl RetrySchedule {
    /// A schedule that has made its first attempt.
    pub fn new() -> Self {
        RetrySchedule { attempts: 1 }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt and decide whether to go again.
    pub fn after_failure(&mut self, error_message: &str) -> Disposition {
        if self.attempts < MAX_ATTEMPTS && is_transient(error_message) {
            self.attempts += 1;
            Disposition::Retry {
                backoff_ms: RETRY_BACKOFF_MS,
            }
        } else {
            Disposition::GiveUp
        }
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new()
    }
}
