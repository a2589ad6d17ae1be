//! KV key layout for the biometric store.
//!
//! Audit keys embed a zero-padded nanosecond timestamp so a prefix scan
//! returns rows in chronological order.
//!
//! ```text
//! vp:{user}:{print_id}          -> VoiceprintRecord
//! log:verify:{ts_ns:020}:{user} -> VerificationLog
//! log:enroll:{ts_ns:020}:{user} -> EnrollmentAudit
//! policy:{scope}                -> EnrollmentPolicy
//! ```
//!
//! Cache keys (TTL cache, separate namespace):
//!
//! ```text
//! vpc:{user}                    -> Vec<VoiceprintRecord>
//! sess:{session_id}             -> EnrollmentSession
//! ```

/// KV key for one stored voiceprint.
pub fn voiceprint_key(user_id: &str, print_id: &str) -> String {
    format!("vp:{user_id}:{print_id}")
}

/// Prefix listing all voiceprints of a user.
pub fn voiceprint_prefix(user_id: &str) -> String {
    format!("vp:{user_id}:")
}

/// KV key for a verification log row.
pub fn verification_log_key(ts_ns: i64, user_id: &str) -> String {
    format!("log:verify:{ts_ns:020}:{user_id}")
}

/// KV key for an enrollment audit row.
pub fn enrollment_audit_key(ts_ns: i64, user_id: &str) -> String {
    format!("log:enroll:{ts_ns:020}:{user_id}")
}

/// KV key for the enrollment policy of a scope ("default", a site id...).
pub fn policy_key(scope: &str) -> String {
    format!("policy:{scope}")
}

/// Cache key for a user's voiceprint set.
pub fn voiceprint_cache_key(user_id: &str) -> String {
    format!("vpc:{user_id}")
}

/// Cache key for an enrollment session.
pub fn session_key(session_id: &str) -> String {
    format!("sess:{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voiceprint_key_format() {
        assert_eq!(voiceprint_key("u1", "abc"), "vp:u1:abc");
        assert_eq!(voiceprint_prefix("u1"), "vp:u1:");
    }

    #[test]
    fn log_keys_sort_chronologically() {
        let k1 = verification_log_key(9_000, "u");
        let k2 = verification_log_key(10_000, "u");
        assert!(k1 < k2, "zero-padded timestamps must sort: {k1} < {k2}");
    }

    #[test]
    fn cache_keys_are_namespaced() {
        assert_eq!(voiceprint_cache_key("u1"), "vpc:u1");
        assert_eq!(session_key("deadbeef"), "sess:deadbeef");
    }
}
