//! Stored entries and their expiry.

use std::time::{Duration, Instant};

use stash_core::Value;

/// What a key holds.
#[derive(Clone, Debug)]
pub(crate) enum Data {
    Scalar(Value),
    List(Vec<Value>),
}

impl Data {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Data::Scalar(v) => v.kind(),
            Data::List(_) => "list",
        }
    }
}

/// Store entry with optional expiry. Replaced wholesale on overwrite.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) data: Data,
    pub(crate) inserted_at: Instant,
    pub(crate) expires_at: Option<Instant>,
}

impl Entry {
    pub(crate) fn new(data: Data, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            data,
            inserted_at: now,
            expires_at: ttl.map(|t| now + t),
        }
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub(crate) fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = Entry::new(Data::Scalar(Value::from(1)), None);
        assert!(!entry.is_expired(Instant::now() + Duration::from_secs(3600)));
        assert_eq!(entry.remaining(Instant::now()), None);
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = Entry::new(Data::Scalar(Value::from(1)), Some(Duration::from_secs(10)));
        let at = entry.expires_at.unwrap();
        assert!(!entry.is_expired(at - Duration::from_millis(1)));
        assert!(entry.is_expired(at));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Data::List(vec![]).kind(), "list");
        assert_eq!(Data::Scalar(Value::from("x")).kind(), "string");
    }
}
