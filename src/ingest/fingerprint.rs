use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the pseudonymous visitor fingerprint for one calendar day.
///
/// Computes HMAC-SHA256(ip || '|' || user_agent) keyed with the daily salt.
/// The `|` delimiter keeps the input unambiguous: ("1", "23") and ("12", "3")
/// hash differently. The page URL is deliberately not an input — uniqueness
/// is per-site-per-day, and the ledger and rollup counters both rely on that.
/// Raw addresses are never stored in the ledger; only this hash is.
pub fn fingerprint(client_ip: &str, user_agent: &str, daily_salt: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(daily_salt.as_bytes()).expect("HMAC accepts any key length");
    mac.update(client_ip.as_bytes());
    mac.update(b"|");
    mac.update(user_agent.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Derive the salt for a given date.
///
/// Folding the date into the key bounds every fingerprint's lifetime to one
/// day: there is no stable cross-day identifier to correlate. The secret
/// comes from configuration so fingerprints stay deterministic across
/// restarts within the same day.
pub fn daily_salt(secret: &str, date: chrono::NaiveDate) -> String {
    let input = format!("{secret}:{date}");
    let mut mac =
        HmacSha256::new_from_slice(b"petrel-fingerprint-salt").expect("HMAC accepts any key length");
    mac.update(input.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    proptest! {
        /// Determinism: identical inputs always yield the same fingerprint.
        #[test]
        fn prop_fingerprint_deterministic(
            ip in "[0-9a-z.]{1,20}",
            ua in "[A-Za-z0-9]{1,50}",
            salt in "[A-Za-z0-9]{1,30}",
        ) {
            let a = fingerprint(&ip, &ua, &salt);
            let b = fingerprint(&ip, &ua, &salt);
            prop_assert_eq!(a, b);
        }

        /// Distinct addresses (same UA and salt) produce distinct fingerprints.
        ///
        /// Non-overlapping suffix ranges guarantee the two IPs always differ.
        #[test]
        fn prop_fingerprint_unique_per_ip(
            suffix_a in 0u8..128u8,
            suffix_b in 128u8..=255u8,
            ua in "[A-Za-z0-9]{1,20}",
            salt in "[A-Za-z0-9]{1,20}",
        ) {
            let a = fingerprint(&format!("10.0.0.{suffix_a}"), &ua, &salt);
            let b = fingerprint(&format!("10.0.0.{suffix_b}"), &ua, &salt);
            prop_assert_ne!(a, b);
        }

        /// Daily rotation: different days always yield different salts.
        ///
        /// day_a is in [0, 180) and day_b in [180, 360), so they never collide.
        #[test]
        fn prop_daily_salt_rotates(
            secret in "[A-Za-z0-9]{1,20}",
            day_a in 0u32..180u32,
            day_b in 180u32..360u32,
        ) {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let s_a = daily_salt(&secret, base + Duration::days(i64::from(day_a)));
            let s_b = daily_salt(&secret, base + Duration::days(i64::from(day_b)));
            prop_assert_ne!(s_a, s_b);
        }
    }
}
