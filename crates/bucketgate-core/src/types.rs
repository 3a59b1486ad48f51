use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Upper bound on readiness attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAttempts {
    Limited(NonZeroU32),
    /// Keep trying forever. Startup hangs if the backend never answers.
    Unlimited,
}

impl MaxAttempts {
    /// `0` selects [`MaxAttempts::Unlimited`].
    pub fn from_count(count: u32) -> Self {
        match NonZeroU32::new(count) {
            Some(n) => MaxAttempts::Limited(n),
            None => MaxAttempts::Unlimited,
        }
    }

    /// Whether `attempt` (1-based) is the last one allowed.
    pub fn is_last(&self, attempt: u32) -> bool {
        match self {
            MaxAttempts::Limited(n) => attempt >= n.get(),
            MaxAttempts::Unlimited => false,
        }
    }
}

impl fmt::Display for MaxAttempts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxAttempts::Limited(n) => write!(f, "{n}"),
            MaxAttempts::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Fixed-interval retry policy for the startup readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: MaxAttempts,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    pub fn bounded(attempts: NonZeroU32, interval: Duration) -> Self {
        Self {
            max_attempts: MaxAttempts::Limited(attempts),
            interval,
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            max_attempts: MaxAttempts::Unlimited,
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MaxAttempts::from_count(Self::DEFAULT_ATTEMPTS),
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}
