//! Persistence and caching for the voice biometric core.
//!
//! Layout mirrors a flat KV model:
//!
//! ```text
//! vp:{user}:{print_id}          -> msgpack VoiceprintRecord
//! log:verify:{ts_ns:020}:{user} -> msgpack VerificationLog
//! log:enroll:{ts_ns:020}:{user} -> msgpack EnrollmentAudit
//! policy:{scope}                -> msgpack EnrollmentPolicy
//! ```
//!
//! [`BiometricStore`] is the typed facade: it serves voiceprint reads
//! cache-first with a TTL and invalidates the cache synchronously on
//! every voiceprint write, so verification sees at most `cache_ttl` of
//! staleness in the absence of writes and immediate consistency across
//! them. Audit rows are append-only and never mutated.

mod cache;
mod error;
mod keys;
mod kv;
mod records;
mod store;

pub use cache::{MemoryCache, TtlCache};
pub use error::StoreError;
pub use keys::{
    enrollment_audit_key, policy_key, session_key, verification_log_key, voiceprint_cache_key,
    voiceprint_key, voiceprint_prefix,
};
pub use kv::{Kv, MemoryKv, RedbKv};
pub use records::{
    now_nanos, EnrollmentAudit, EnrollmentPolicy, VerificationLog, VerifyResult, VoiceprintRecord,
};
pub use store::BiometricStore;
