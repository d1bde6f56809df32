//! ID generation utilities.

use chrono::{DateTime, Utc};
use ulid::Ulid;
use uuid::Uuid;

/// ID generator for stored files and submission numbers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable, which keeps upload keys
    /// roughly ordered by time on disk.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a cryptographically secure random token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a human-readable clearance submission number for the current time.
    #[must_use]
    pub fn submission_number(&self) -> String {
        self.submission_number_at(Utc::now())
    }

    /// Generate a submission number for the given instant.
    ///
    /// Format: `SBA-YYYYMMDDHHMMSS-XXXX`, the suffix being the tail of a
    /// ULID so two requests in the same second still differ.
    #[must_use]
    pub fn submission_number_at(&self, at: DateTime<Utc>) -> String {
        let ulid = Ulid::new().to_string();
        let suffix = &ulid[ulid.len() - 4..];
        format!("SBA-{}-{suffix}", at.format("%Y%m%d%H%M%S"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32);
    }

    #[test]
    fn test_submission_number_format() {
        let id_gen = IdGenerator::new();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 5).unwrap();
        let number = id_gen.submission_number_at(at);

        assert!(number.starts_with("SBA-20250601083005-"));
        assert_eq!(number.len(), "SBA-20250601083005-".len() + 4);
    }

    #[test]
    fn test_submission_numbers_differ_within_same_second() {
        let id_gen = IdGenerator::new();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 5).unwrap();
        let numbers: std::collections::HashSet<_> =
            (0..32).map(|_| id_gen.submission_number_at(at)).collect();

        assert!(numbers.len() > 1);
    }
}
