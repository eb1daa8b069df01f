/// The address every Si70xx answers on.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// How long to keep polling a sensor that declines requests while busy.
///
/// The sensor does not answer while resetting or converting, so both phases are polled. The
/// policy bounds that loop instead of waiting forever on a sensor that went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_us: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

    /// At least one attempt is always made, `max_attempts` of 0 counts as 1.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff_us: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            backoff_us,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between two attempts, `0` polls back to back.
    #[must_use]
    pub const fn backoff_us(&self) -> u32 {
        self.backoff_us
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit i2c address.
    pub address: u8,
    pub retry: RetryPolicy,
}

impl Config {
    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            retry: RetryPolicy::default(),
        }
    }
}
