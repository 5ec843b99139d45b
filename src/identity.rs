//! Simulation identity issuing and replay derivation.
//!
//! A fresh id is a literal prefix followed by a fixed-width, zero-padded
//! random number (`SIM-04821937`). A replay id is the original id with a
//! two-digit retry suffix (`SIM-04821937-03`). The manager only formats and
//! parses ids; retry counters live with the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default literal prefix of fresh ids.
pub const DEFAULT_PREFIX: &str = "SIM-";
/// Default width of the numeric part of fresh ids (10^8 distinct values).
pub const DEFAULT_DIGITS: u32 = 8;
/// Accepted widths for the numeric part.
pub const DIGITS_RANGE: std::ops::RangeInclusive<u32> = 8..=18;
/// Largest retry count a two-digit suffix can carry.
pub const MAX_RETRY: u32 = 99;

// ─────────────────────────────────────────────────────────────────
// Identity Types
// ─────────────────────────────────────────────────────────────────

/// Identity of one simulation session. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationIdentity {
    pub id: String,
    pub is_replay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl SimulationIdentity {
    fn fresh(id: String) -> Self {
        Self {
            id,
            is_replay: false,
            original_id: None,
            retry_count: None,
        }
    }

    fn replay(original: &str, retry_count: u32) -> Self {
        Self {
            id: format!("{}-{:02}", original, retry_count),
            is_replay: true,
            original_id: Some(original.to_string()),
            retry_count: Some(retry_count),
        }
    }

    /// The id replays of this session are derived from.
    pub fn original(&self) -> &str {
        self.original_id.as_deref().unwrap_or(&self.id)
    }
}

/// Structured reading of an id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedId {
    Fresh {
        id: String,
    },
    Replay {
        original: String,
        #[serde(rename = "retryCount")]
        retry_count: u32,
    },
}

impl ParsedId {
    pub fn is_replay(&self) -> bool {
        matches!(self, ParsedId::Replay { .. })
    }

    pub fn original(&self) -> &str {
        match self {
            ParsedId::Fresh { id } => id,
            ParsedId::Replay { original, .. } => original,
        }
    }
}

impl From<ParsedId> for SimulationIdentity {
    fn from(parsed: ParsedId) -> Self {
        match parsed {
            ParsedId::Fresh { id } => SimulationIdentity::fresh(id),
            ParsedId::Replay {
                original,
                retry_count,
            } => SimulationIdentity::replay(&original, retry_count),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// String Rules
// ─────────────────────────────────────────────────────────────────

/// Split a trailing `-DD` suffix off `id`, if present.
fn split_suffix(id: &str) -> Option<(&str, u32)> {
    let bytes = id.as_bytes();
    let n = bytes.len();
    if n < 3 || bytes[n - 3] != b'-' {
        return None;
    }
    let (tens, ones) = (bytes[n - 2], bytes[n - 1]);
    if !tens.is_ascii_digit() || !ones.is_ascii_digit() {
        return None;
    }
    let retry = u32::from(tens - b'0') * 10 + u32::from(ones - b'0');
    Some((&id[..n - 3], retry))
}

/// True iff `id` ends in a dash followed by exactly two digits.
pub fn is_replay(id: &str) -> bool {
    split_suffix(id).is_some()
}

/// Strip replay suffixes until none remain. Idempotent for every input.
pub fn original_of(id: &str) -> &str {
    let mut current = id;
    while let Some((stem, _)) = split_suffix(current) {
        current = stem;
    }
    current
}

/// Parse an id into its fresh or replay reading.
pub fn parse(id: &str) -> Result<ParsedId> {
    if id.is_empty() {
        return Err(Error::identity_malformed(id, "id is empty"));
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::identity_malformed(id, "id contains whitespace or control characters"));
    }

    match split_suffix(id) {
        None => Ok(ParsedId::Fresh { id: id.to_string() }),
        Some((_, 0)) => Err(Error::identity_malformed(id, "retry count must be positive")),
        Some(("", _)) => Err(Error::identity_malformed(id, "replay suffix without an original id")),
        Some((original, _)) if is_replay(original) => {
            Err(Error::identity_malformed(id, "replay suffix applied to a replay id"))
        }
        Some((original, retry_count)) => Ok(ParsedId::Replay {
            original: original.to_string(),
            retry_count,
        }),
    }
}

/// Next retry count for a caller holding the previous one.
pub fn next_retry(previous: Option<u32>) -> Result<u32> {
    let next = previous.map_or(1, |p| p.saturating_add(1));
    if next > MAX_RETRY {
        return Err(Error::RetryCountOutOfRange { retry_count: next });
    }
    Ok(next)
}

// ─────────────────────────────────────────────────────────────────
// Identity Manager
// ─────────────────────────────────────────────────────────────────

/// Issues fresh and replay identities under a configured id format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityManager {
    prefix: String,
    digits: u32,
}

impl IdentityManager {
    pub fn new(prefix: impl Into<String>, digits: u32) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::config_field_invalid(
                "identity.prefix",
                "prefix must be non-empty and contain no whitespace",
            ));
        }
        if !DIGITS_RANGE.contains(&digits) {
            return Err(Error::config_field_invalid(
                "identity.digits",
                format!(
                    "digits must be between {} and {}",
                    DIGITS_RANGE.start(),
                    DIGITS_RANGE.end()
                ),
            ));
        }
        Ok(Self { prefix, digits })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Number of distinct fresh ids this format can produce.
    pub fn id_space(&self) -> u64 {
        10u64.pow(self.digits)
    }

    /// Issue a fresh identity from random entropy.
    pub fn issue_fresh(&self) -> SimulationIdentity {
        let entropy = Uuid::new_v4().as_u128();
        self.issue_fresh_from(entropy)
    }

    /// Issue a fresh identity from a caller-provided number.
    ///
    /// The number is reduced into the id space, so any value is accepted.
    /// The zero-padded width is at least eight digits, so the id never ends
    /// in a dash followed by two digits.
    pub fn issue_fresh_from(&self, n: u128) -> SimulationIdentity {
        let value = n % u128::from(self.id_space());
        let id = format!(
            "{}{:0width$}",
            self.prefix,
            value,
            width = self.digits as usize
        );
        debug!(id = %id, "Issued fresh simulation id");
        SimulationIdentity::fresh(id)
    }

    /// Derive a replay identity from an original session id.
    ///
    /// `original_id` is validated with [`parse`] first, so an empty id or one
    /// containing whitespace or control characters is rejected as
    /// [`Error::IdentityMalformed`] even though it carries no replay suffix.
    /// Ids that already end in `-DD` fail with [`Error::ReplayOfReplay`].
    pub fn issue_replay(&self, original_id: &str, retry_count: u32) -> Result<SimulationIdentity> {
        if !(1..=MAX_RETRY).contains(&retry_count) {
            return Err(Error::RetryCountOutOfRange { retry_count });
        }
        match parse(original_id)? {
            ParsedId::Replay { .. } => Err(Error::ReplayOfReplay {
                id: original_id.to_string(),
            }),
            ParsedId::Fresh { id } => {
                let identity = SimulationIdentity::replay(&id, retry_count);
                debug!(id = %identity.id, original = %id, retry_count, "Issued replay simulation id");
                Ok(identity)
            }
        }
    }

    /// Rebuild the identity record an id string stands for.
    pub fn identify(&self, id: &str) -> Result<SimulationIdentity> {
        parse(id).map(SimulationIdentity::from)
    }

    pub fn is_replay(&self, id: &str) -> bool {
        is_replay(id)
    }

    pub fn original_of<'a>(&self, id: &'a str) -> &'a str {
        original_of(id)
    }
}

impl Default for IdentityManager {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            digits: DEFAULT_DIGITS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_id_format() {
        let manager = IdentityManager::default();
        let identity = manager.issue_fresh_from(42);
        assert_eq!(identity.id, "SIM-00000042");
        assert!(!identity.is_replay);
        assert!(identity.original_id.is_none());
        assert!(identity.retry_count.is_none());
    }

    #[test]
    fn test_fresh_ids_are_never_replays() {
        let manager = IdentityManager::default();
        for n in [0u128, 1, 9, 10, 99, 100, 12_345_678, 99_999_999, u128::MAX] {
            let identity = manager.issue_fresh_from(n);
            assert!(!is_replay(&identity.id), "{} looks like a replay", identity.id);
            assert_eq!(identity.id.len(), 12);
        }
        for _ in 0..200 {
            assert!(!manager.issue_fresh().is_replay);
        }
    }

    #[test]
    fn test_fresh_ids_differ() {
        let manager = IdentityManager::default();
        let a = manager.issue_fresh();
        let b = manager.issue_fresh();
        // One in 10^8 chance of a false failure.
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_replay_round_trip() {
        let manager = IdentityManager::default();
        for original in ["SIM-12345678", "legacy", "a-1", "a-123", "x-ab"] {
            for retry in [1, 2, 9, 10, 42, 99] {
                let replay = manager.issue_replay(original, retry).unwrap();
                assert!(is_replay(&replay.id));
                assert_eq!(original_of(&replay.id), original);
                assert_eq!(replay.retry_count, Some(retry));
                assert_eq!(replay.original(), original);
            }
        }
    }

    #[test]
    fn test_replay_suffix_zero_padded() {
        let manager = IdentityManager::default();
        let replay = manager.issue_replay("SIM-00000042", 3).unwrap();
        assert_eq!(replay.id, "SIM-00000042-03");
        assert!(replay.is_replay);
        assert_eq!(replay.original_id.as_deref(), Some("SIM-00000042"));
    }

    #[test]
    fn test_replay_retry_out_of_range() {
        let manager = IdentityManager::default();
        for retry in [0, 100, 250] {
            let err = manager.issue_replay("SIM-00000042", retry).unwrap_err();
            assert!(matches!(err, Error::RetryCountOutOfRange { retry_count } if retry_count == retry));
        }
    }

    #[test]
    fn test_replay_of_replay_rejected() {
        let manager = IdentityManager::default();
        let err = manager.issue_replay("SIM-00000042-01", 2).unwrap_err();
        assert!(matches!(err, Error::ReplayOfReplay { .. }));
    }

    #[test]
    fn test_replay_rejects_malformed_original() {
        let manager = IdentityManager::default();
        for id in ["", "SIM 42", "SIM-42\t"] {
            let err = manager.issue_replay(id, 1).unwrap_err();
            assert!(matches!(err, Error::IdentityMalformed { .. }), "{:?} accepted", id);
        }
        assert!(manager.issue_replay("legacy_session.7", 1).is_ok());
    }

    #[test]
    fn test_original_of_idempotent() {
        for id in ["", "-", "-12", "a-12-34", "SIM-1", "abc", "x-99-99-99", "a--12", "ä-07"] {
            let once = original_of(id);
            assert_eq!(original_of(once), once, "not idempotent for {:?}", id);
        }
        assert_eq!(original_of("a-12-34"), "a");
        assert_eq!(original_of("SIM-1"), "SIM-1");
    }

    #[test]
    fn test_is_replay_matches_exactly_two_digits() {
        assert!(is_replay("x-01"));
        assert!(is_replay("-12"));
        assert!(!is_replay("x-1"));
        assert!(!is_replay("x-123"));
        assert!(!is_replay("x_12"));
        assert!(!is_replay("x-1a"));
        assert!(!is_replay("x-٣٣"));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse("SIM-00000042").unwrap(),
            ParsedId::Fresh { id: "SIM-00000042".into() }
        );
        assert_eq!(
            parse("SIM-00000042-07").unwrap(),
            ParsedId::Replay {
                original: "SIM-00000042".into(),
                retry_count: 7
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for id in ["", "SIM 1", "SIM-1\n", "SIM-00000042-00", "-05", "SIM-1-01-02"] {
            let err = parse(id).unwrap_err();
            assert!(matches!(err, Error::IdentityMalformed { .. }), "{:?} accepted", id);
        }
    }

    #[test]
    fn test_identify_rebuilds_record() {
        let manager = IdentityManager::default();
        let issued = manager.issue_replay("SIM-00000042", 12).unwrap();
        assert_eq!(manager.identify(&issued.id).unwrap(), issued);
    }

    #[test]
    fn test_next_retry() {
        assert_eq!(next_retry(None).unwrap(), 1);
        assert_eq!(next_retry(Some(1)).unwrap(), 2);
        assert_eq!(next_retry(Some(98)).unwrap(), 99);
        assert!(next_retry(Some(99)).is_err());
        assert!(next_retry(Some(u32::MAX)).is_err());
    }

    #[test]
    fn test_manager_validation() {
        assert!(IdentityManager::new("SIM-", 8).is_ok());
        assert!(IdentityManager::new("", 8).is_err());
        assert!(IdentityManager::new("S M-", 8).is_err());
        assert!(IdentityManager::new("SIM-", 2).is_err());
        assert!(IdentityManager::new("SIM-", 19).is_err());
    }

    #[test]
    fn test_custom_format() {
        let manager = IdentityManager::new("RP", 10).unwrap();
        let identity = manager.issue_fresh_from(7);
        assert_eq!(identity.id, "RP0000000007");
        assert_eq!(manager.id_space(), 10_000_000_000);
    }

    #[test]
    fn test_identity_serializes_camel_case() {
        let manager = IdentityManager::default();
        let json = serde_json::to_value(manager.issue_replay("SIM-00000042", 1).unwrap()).unwrap();
        assert_eq!(json["isReplay"], true);
        assert_eq!(json["originalId"], "SIM-00000042");
        assert_eq!(json["retryCount"], 1);

        let fresh = serde_json::to_value(manager.issue_fresh_from(1)).unwrap();
        assert!(fresh.get("originalId").is_none());
    }
}
