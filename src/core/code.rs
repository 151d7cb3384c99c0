use crate::core::{ReplayError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref REPLAY_CODE: Regex = Regex::new(r"^[A-Z0-9]{16}$").unwrap();
    static ref DASHED_REPLAY_CODE: Regex =
        Regex::new(r"^([A-Z0-9]{4})-([A-Z0-9]{4})-([A-Z0-9]{4})-([A-Z0-9]{4})$").unwrap();
}

/// Length of a normalized replay code.
pub const REPLAY_CODE_LEN: usize = 16;

/// A validated replay code: 16 uppercase alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplayCode(String);

impl ReplayCode {
    /// Normalizes and validates a user supplied code.
    ///
    /// `AAAA-BBBB-CCCC-DDDD` collapses to `AAAABBBBCCCCDDDD`. Anything that is
    /// not 16 uppercase alphanumerics afterwards is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize(raw);
        if REPLAY_CODE.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ReplayError::InvalidCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dash-grouped form shown to players, `XXXX-XXXX-XXXX-XXXX`.
    pub fn formatted(&self) -> String {
        let code = self.0.as_str();
        format!(
            "{}-{}-{}-{}",
            &code[0..4],
            &code[4..8],
            &code[8..12],
            &code[12..16]
        )
    }
}

/// Strips the dash grouping from a code. Input that does not have the
/// grouped shape is returned unchanged.
pub fn normalize(raw: &str) -> String {
    DASHED_REPLAY_CODE.replace(raw, "$1$2$3$4").into_owned()
}

impl fmt::Display for ReplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReplayCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
