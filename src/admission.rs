//! Gate applied to every worker submission before it counts.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. **Proof of work**: SHA-256 of the raw payload must start with at least
//!    `difficulty` zero bits inside its leading `window_bits` bits.
//! 2. **Fields**: the payload is URL-query encoded and carries a decimal
//!    `time` and a (possibly empty) `response`. Other keys are ignored.
//! 3. **Freshness**: `time` is not earlier than the moment the current job
//!    was assigned, so work computed before the job existed is refused.

use sha2::{Digest, Sha256};

use crate::config::AdmissionConfig;
use crate::error::Rejection;

/// Count zero bits at the front of `digest`, looking at no more than the
/// first `window_bits` bits (capped at 64).
pub fn leading_zero_bits(digest: &[u8], window_bits: u32) -> u32 {
    let window_bits = window_bits.min(64);
    if window_bits == 0 {
        return 0;
    }
    let mut prefix = [0u8; 8];
    let n = digest.len().min(8);
    prefix[..n].copy_from_slice(&digest[..n]);
    let value = u64::from_be_bytes(prefix);

    let mask = if window_bits == 64 {
        u64::MAX
    } else {
        !(u64::MAX >> window_bits)
    };
    (value & mask).leading_zeros().min(window_bits)
}

/// Whether `payload` carries enough proof of work.
pub fn admits(payload: &[u8], window_bits: u32, difficulty: u32) -> bool {
    let digest = Sha256::digest(payload);
    leading_zero_bits(&digest, window_bits) >= difficulty
}

/// Worker side of the proof of work: append a `nonce` field to `body`
/// until the whole payload is admitted.
pub fn solve(body: &str, config: AdmissionConfig) -> String {
    let mut nonce: u64 = 0;
    loop {
        let candidate = format!("{body}&nonce={nonce}");
        if admits(candidate.as_bytes(), config.window_bits, config.difficulty) {
            return candidate;
        }
        nonce += 1;
    }
}

/// The fields of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Worker-observed send time, unix seconds
    pub time: u64,
    /// Empty means the worker skipped the job
    pub response: String,
}

impl Submission {
    pub fn parse(payload: &str) -> Result<Self, Rejection> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(payload)
            .map_err(|e| Rejection::Malformed(e.to_string()))?;

        let field = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
        };

        let raw_time = field("time").ok_or(Rejection::MissingField("time"))?;
        let time = raw_time
            .parse::<u64>()
            .map_err(|_| Rejection::InvalidTime(raw_time.clone()))?;
        let response = field("response")
            .ok_or(Rejection::MissingField("response"))?
            .clone();

        Ok(Self { time, response })
    }

    pub fn is_skip(&self) -> bool {
        self.response.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionFilter {
    config: AdmissionConfig,
}

impl AdmissionFilter {
    pub fn new(config: AdmissionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AdmissionConfig {
        self.config
    }

    /// Run all checks against a submission for a job assigned at
    /// `assigned_at` (unix seconds).
    pub fn check(&self, payload: &str, assigned_at: u64) -> Result<Submission, Rejection> {
        if payload.is_empty() {
            return Err(Rejection::EmptyPayload);
        }

        let digest = Sha256::digest(payload.as_bytes());
        let zeros = leading_zero_bits(&digest, self.config.window_bits);
        if zeros < self.config.difficulty {
            return Err(Rejection::InsufficientWork {
                zeros,
                required: self.config.difficulty,
            });
        }

        let submission = Submission::parse(payload)?;
        if submission.time < assigned_at {
            return Err(Rejection::Stale {
                submitted: submission.time,
                assigned: assigned_at,
            });
        }
        Ok(submission)
    }
}
