//! Voice enrollment workflow.
//!
//! Enrollment is the most security-sensitive path in the system: a
//! compromised enrollment poisons every later verification for that
//! user. The workflow is five hard gates, each a separate request:
//!
//! 1. eligibility ([`EnrollmentService::check_eligibility`])
//! 2. sample collection ([`EnrollmentService::create_session`],
//!    [`EnrollmentService::collect_sample`])
//! 3. voiceprint generation ([`EnrollmentService::generate_voiceprint`],
//!    consistency-gated)
//! 4. supervisor approval ([`EnrollmentService::request_approval`])
//! 5. finalization ([`EnrollmentService::finalize`], atomic persistence)
//!
//! Session state lives in the TTL cache between requests and is modeled
//! as an explicit state machine ([`SessionState`]) with checked
//! transitions. Expiry is lazy: an expired session is rejected on next
//! access, there is no timer.

mod error;
mod service;
mod session;
mod types;

pub use error::EnrollError;
pub use service::{EnrollmentService, ServiceConfig};
pub use session::{session_id_for, CollectedSample, EnrollmentSession, SessionState};
pub use types::{
    ApprovalDecision, ApprovalRequest, EligibilityReport, FinalizeResult, SampleOutcome,
    VoiceprintDraft,
};
