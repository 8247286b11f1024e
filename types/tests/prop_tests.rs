use proptest::prelude::*;

use haven_types::{Commitment, FuzzyDigest, RecordId, Salt, Timestamp};

proptest! {
    /// The textual form of a digest is always 64 hex characters and parses back.
    #[test]
    fn digest_text_form_is_fixed_width(bytes in prop::array::uniform32(0u8..)) {
        let digest = FuzzyDigest::new(bytes);
        let text = digest.to_string();
        prop_assert_eq!(text.len(), 64);
        prop_assert_eq!(text.parse::<FuzzyDigest>().unwrap(), digest);
    }

    /// Digest and commitment share an encoding but never compare across types.
    #[test]
    fn commitment_hex_matches_digest_hex(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(Commitment::new(bytes).to_hex(), FuzzyDigest::new(bytes).to_hex());
    }

    /// Salt serialization never leaks through Debug.
    #[test]
    fn salt_debug_is_constant(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(format!("{:?}", Salt::new(bytes)), "Salt(..)");
    }

    /// Record ids order like their integers.
    #[test]
    fn record_id_ordering(a in 1u64..u64::MAX, b in 1u64..u64::MAX) {
        prop_assert_eq!(RecordId::new(a) < RecordId::new(b), a < b);
    }

    /// A journal entry's age never exceeds the distance to `now`, and never wraps.
    #[test]
    fn timestamp_age_saturates(base in 0u64..1_000_000, now in 0u64..2_000_000) {
        let written = Timestamp::new(base);
        prop_assert_eq!(written.age(Timestamp::new(now)), now.saturating_sub(base));
    }

    /// Grace-period checks agree with plain arithmetic.
    #[test]
    fn timestamp_grace_period(base in 0u64..1_000_000, grace in 0u64..1_000_000, now in 0u64..3_000_000) {
        let written = Timestamp::new(base);
        prop_assert_eq!(written.is_older_than(grace, Timestamp::new(now)), now >= base + grace);
    }
}
