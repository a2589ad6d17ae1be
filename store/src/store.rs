use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::TtlCache;
use crate::error::StoreError;
use crate::keys;
use crate::kv::Kv;
use crate::records::{
    decode, encode, now_nanos, EnrollmentAudit, EnrollmentPolicy, VerificationLog,
    VoiceprintRecord,
};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Typed facade over the KV backend and the TTL cache.
///
/// Voiceprint reads are served cache-first; every voiceprint write goes
/// through here and invalidates the user's cache entry synchronously.
/// The cache is the only shared mutable resource in the core.
pub struct BiometricStore {
    kv: Arc<dyn Kv>,
    cache: Arc<dyn TtlCache>,
    cache_ttl: Duration,
}

impl BiometricStore {
    pub fn new(kv: Arc<dyn Kv>, cache: Arc<dyn TtlCache>) -> Self {
        Self {
            kv,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    // -- Voiceprints --

    /// Active voiceprints for a user, cache-first.
    pub fn voiceprints_for(&self, user_id: &str) -> Result<Vec<VoiceprintRecord>, StoreError> {
        let cache_key = keys::voiceprint_cache_key(user_id);
        if let Some(bytes) = self.cache.get(&cache_key)? {
            return decode(&bytes);
        }

        let prints: Vec<VoiceprintRecord> = self
            .all_voiceprints(user_id)?
            .into_iter()
            .filter(|p| p.active)
            .collect();
        self.cache.set(&cache_key, &encode(&prints)?, self.cache_ttl)?;
        Ok(prints)
    }

    /// All voiceprints including deactivated ones, straight from the
    /// backend.
    pub fn all_voiceprints(&self, user_id: &str) -> Result<Vec<VoiceprintRecord>, StoreError> {
        self.kv
            .scan(&keys::voiceprint_prefix(user_id))?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    /// Persist a full enrollment's voiceprints in one transaction:
    /// either all land or none do. Invalidates the user's cache entry.
    pub fn store_enrollment(&self, prints: &[VoiceprintRecord]) -> Result<(), StoreError> {
        let first = prints
            .first()
            .ok_or_else(|| StoreError::Serialization("empty voiceprint set".into()))?;
        let user_id = first.user_id.clone();

        let mut entries = Vec::with_capacity(prints.len());
        for p in prints {
            if p.user_id != user_id {
                return Err(StoreError::Serialization(
                    "voiceprint set spans multiple users".into(),
                ));
            }
            entries.push((keys::voiceprint_key(&p.user_id, &p.id), encode(p)?));
        }
        self.kv.batch_set(&entries)?;
        self.invalidate_voiceprints(&user_id)
    }

    /// Replace a user's enrollment: retire every existing voiceprint
    /// and persist the new set in one transaction. A backend failure
    /// leaves the prior enrollment untouched; the user is never left
    /// with the old set retired and the new set absent.
    pub fn replace_enrollment(
        &self,
        user_id: &str,
        prints: &[VoiceprintRecord],
    ) -> Result<(), StoreError> {
        if prints.is_empty() {
            return Err(StoreError::Serialization("empty voiceprint set".into()));
        }
        let mut entries = Vec::new();
        for mut old in self.all_voiceprints(user_id)? {
            old.active = false;
            old.is_primary = false;
            entries.push((keys::voiceprint_key(user_id, &old.id), encode(&old)?));
        }
        for p in prints {
            if p.user_id != user_id {
                return Err(StoreError::Serialization(
                    "voiceprint set spans multiple users".into(),
                ));
            }
            entries.push((keys::voiceprint_key(user_id, &p.id), encode(p)?));
        }
        self.kv.batch_set(&entries)?;
        self.invalidate_voiceprints(user_id)
    }

    /// Bump usage counters after a verified match.
    pub fn touch_usage(
        &self,
        user_id: &str,
        print_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = keys::voiceprint_key(user_id, print_id);
        let bytes = self
            .kv
            .get(&key)?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        let mut print: VoiceprintRecord = decode(&bytes)?;
        print.use_count += 1;
        print.last_used_at = Some(now);
        self.kv.set(&key, &encode(&print)?)?;
        self.invalidate_voiceprints(user_id)
    }

    /// Retire every voiceprint of a user (explicit deactivation).
    pub fn deactivate_all(&self, user_id: &str) -> Result<(), StoreError> {
        let mut entries = Vec::new();
        for mut p in self.all_voiceprints(user_id)? {
            p.active = false;
            p.is_primary = false;
            entries.push((keys::voiceprint_key(user_id, &p.id), encode(&p)?));
        }
        if !entries.is_empty() {
            self.kv.batch_set(&entries)?;
        }
        self.invalidate_voiceprints(user_id)
    }

    /// Timestamp of the most recent enrollment, deactivated prints
    /// included (re-enrollment cooldown counts from it either way).
    pub fn latest_enrollment_at(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .all_voiceprints(user_id)?
            .iter()
            .map(|p| p.created_at)
            .max())
    }

    /// Drop the user's cached voiceprint set. Called on every write
    /// path so readers never see a stale set after a mutation.
    pub fn invalidate_voiceprints(&self, user_id: &str) -> Result<(), StoreError> {
        self.cache.delete(&keys::voiceprint_cache_key(user_id))
    }

    // -- Audit rows --

    pub fn append_verification(&self, log: &VerificationLog) -> Result<(), StoreError> {
        let key = keys::verification_log_key(now_nanos(), &log.user_id);
        self.kv.set(&key, &encode(log)?)
    }

    pub fn verification_logs_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<VerificationLog>, StoreError> {
        let mut logs = Vec::new();
        for (_, v) in self.kv.scan("log:verify:")? {
            let log: VerificationLog = decode(&v)?;
            if log.user_id == user_id {
                logs.push(log);
            }
        }
        Ok(logs)
    }

    pub fn append_enrollment_audit(&self, audit: &EnrollmentAudit) -> Result<(), StoreError> {
        let key = keys::enrollment_audit_key(now_nanos(), &audit.user_id);
        self.kv.set(&key, &encode(audit)?)
    }

    pub fn enrollment_audits_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<EnrollmentAudit>, StoreError> {
        let mut audits = Vec::new();
        for (_, v) in self.kv.scan("log:enroll:")? {
            let audit: EnrollmentAudit = decode(&v)?;
            if audit.user_id == user_id {
                audits.push(audit);
            }
        }
        Ok(audits)
    }

    // -- Policy --

    /// Policy for a scope; falls back to the validated default when no
    /// administrator has saved one.
    pub fn policy(&self, scope: &str) -> Result<EnrollmentPolicy, StoreError> {
        match self.kv.get(&keys::policy_key(scope))? {
            Some(bytes) => decode(&bytes),
            None => Ok(EnrollmentPolicy::default()),
        }
    }

    pub fn save_policy(&self, scope: &str, policy: &EnrollmentPolicy) -> Result<(), StoreError> {
        policy.validate()?;
        self.kv.set(&keys::policy_key(scope), &encode(policy)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::kv::MemoryKv;
    use crate::records::VerifyResult;

    fn store() -> BiometricStore {
        BiometricStore::new(Arc::new(MemoryKv::new()), Arc::new(MemoryCache::new()))
    }

    /// Backend whose batch writes can be made to fail on demand.
    struct FlakyKv {
        inner: MemoryKv,
        fail_batches: std::sync::atomic::AtomicBool,
    }

    impl FlakyKv {
        fn new() -> Self {
            Self {
                inner: MemoryKv::new(),
                fail_batches: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn fail_batches(&self, fail: bool) {
            self.fail_batches
                .store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl Kv for FlakyKv {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key)
        }

        fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
            self.inner.scan(prefix)
        }

        fn batch_set(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
            if self.fail_batches.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Backend("injected write failure".into()));
            }
            self.inner.batch_set(entries)
        }
    }

    fn print(user: &str, id: &str, primary: bool) -> VoiceprintRecord {
        VoiceprintRecord {
            id: id.into(),
            user_id: user.into(),
            embedding: vec![1.0, 0.0],
            snr_db: 25.0,
            duration_seconds: 5.0,
            quality_score: 0.9,
            model: "m".into(),
            validated: true,
            is_primary: primary,
            active: true,
            created_at: Utc::now(),
            use_count: 0,
            last_used_at: None,
        }
    }

    #[test]
    fn store_enrollment_and_read_back() {
        let s = store();
        s.store_enrollment(&[print("u1", "a", true), print("u1", "b", false)])
            .unwrap();

        let prints = s.voiceprints_for("u1").unwrap();
        assert_eq!(prints.len(), 2);
        assert_eq!(prints.iter().filter(|p| p.is_primary).count(), 1);
    }

    #[test]
    fn store_enrollment_rejects_mixed_users() {
        let s = store();
        let err = s
            .store_enrollment(&[print("u1", "a", true), print("u2", "b", false)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn cache_is_invalidated_on_write() {
        let s = store();
        s.store_enrollment(&[print("u1", "a", true)]).unwrap();

        // Populate the cache.
        assert_eq!(s.voiceprints_for("u1").unwrap().len(), 1);

        // A second enrollment write must be visible immediately.
        s.store_enrollment(&[print("u1", "b", false)]).unwrap();
        assert_eq!(s.voiceprints_for("u1").unwrap().len(), 2);
    }

    #[test]
    fn replacement_retires_old_set_and_persists_new() {
        let s = store();
        s.store_enrollment(&[print("u1", "old", true)]).unwrap();

        s.replace_enrollment("u1", &[print("u1", "a", true), print("u1", "b", false)])
            .unwrap();

        let active = s.voiceprints_for("u1").unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|p| p.id != "old"));
        assert_eq!(active.iter().filter(|p| p.is_primary).count(), 1);
        // The retired print is kept for audit.
        assert_eq!(s.all_voiceprints("u1").unwrap().len(), 3);
    }

    #[test]
    fn failed_replacement_leaves_prior_enrollment_intact() {
        let kv = Arc::new(FlakyKv::new());
        let s = BiometricStore::new(kv.clone(), Arc::new(MemoryCache::new()));
        s.store_enrollment(&[print("u1", "old", true)]).unwrap();

        kv.fail_batches(true);
        let err = s
            .replace_enrollment("u1", &[print("u1", "new", true)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        kv.fail_batches(false);
        let active = s.voiceprints_for("u1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "old");
        assert!(active[0].is_primary, "old enrollment still serves matches");
    }

    #[test]
    fn deactivation_hides_prints_from_readers() {
        let s = store();
        s.store_enrollment(&[print("u1", "a", true)]).unwrap();
        s.deactivate_all("u1").unwrap();

        assert!(s.voiceprints_for("u1").unwrap().is_empty());
        // The record itself is retained for audit.
        assert_eq!(s.all_voiceprints("u1").unwrap().len(), 1);
        // And the enrollment timestamp still counts for the cooldown.
        assert!(s.latest_enrollment_at("u1").unwrap().is_some());
    }

    #[test]
    fn touch_usage_bumps_counters() {
        let s = store();
        s.store_enrollment(&[print("u1", "a", true)]).unwrap();
        s.touch_usage("u1", "a", Utc::now()).unwrap();

        let prints = s.voiceprints_for("u1").unwrap();
        assert_eq!(prints[0].use_count, 1);
        assert!(prints[0].last_used_at.is_some());
    }

    #[test]
    fn verification_logs_append_and_filter() {
        let s = store();
        for user in ["u1", "u2", "u1"] {
            s.append_verification(&VerificationLog {
                user_id: user.into(),
                result: VerifyResult::Rejected,
                best_similarity: 0.0,
                confidence: 0.0,
                fraud_risk: 0.0,
                quality_score: 0.5,
                fraud_indicators: Vec::new(),
                challenge_kind: None,
                attendance_record_id: None,
                processing_ms: 12,
                created_at: Utc::now(),
            })
            .unwrap();
        }
        assert_eq!(s.verification_logs_for("u1").unwrap().len(), 2);
        assert_eq!(s.verification_logs_for("u2").unwrap().len(), 1);
    }

    #[test]
    fn policy_defaults_and_saves() {
        let s = store();
        let p = s.policy("default").unwrap();
        assert_eq!(p.min_samples, 5);

        let mut custom = EnrollmentPolicy::default();
        custom.min_samples = 6;
        custom.max_samples = 6;
        s.save_policy("site-7", &custom).unwrap();
        assert_eq!(s.policy("site-7").unwrap().min_samples, 6);

        custom.max_samples = 2;
        assert!(s.save_policy("site-7", &custom).is_err());
    }
}
