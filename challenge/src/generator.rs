use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::rng::{rand_below, rand_range, shuffle};
use crate::types::{Challenge, ChallengeKind, Difficulty, Expected};
use crate::ChallengeError;

/// Profile fields consumed by personal challenges. Any field may be
/// empty; generation falls back to a temporal challenge when the data
/// needed for the chosen kind is missing.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub display_name: String,
    pub department: String,
    pub work_city: String,
}

/// Tuning for challenge generation.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Validity window bounds in seconds. Each challenge gets a random
    /// window within these bounds.
    pub min_validity_secs: u32,
    pub max_validity_secs: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_validity_secs: 30,
            max_validity_secs: 60,
        }
    }
}

const LIVENESS_PHRASES: &[&str] = &[
    "my voice is my passport",
    "the quick brown fox jumps over the lazy dog",
    "authentication in progress",
];

const MULTILINGUAL_PAIRS: &[(&str, &str)] = &[
    ("good morning", "buenos dias"),
    ("thank you", "merci beaucoup"),
    ("good evening", "buona sera"),
];

/// Produces unpredictable, time-bound challenges.
///
/// Enrollment sets are type-diverse: temporal, visual-correlation and
/// liveness kinds are always present, the remainder is drawn randomly
/// from the full kind set, and the result is shuffled.
pub struct ChallengeGenerator {
    cfg: GeneratorConfig,
}

impl ChallengeGenerator {
    pub fn new(cfg: GeneratorConfig) -> Self {
        // An inverted window collapses to its lower bound, so
        // `rand_range` always sees `lo <= hi`.
        let cfg = GeneratorConfig {
            max_validity_secs: cfg.max_validity_secs.max(cfg.min_validity_secs),
            ..cfg
        };
        Self { cfg }
    }

    /// A set of `n` challenges for an enrollment session.
    ///
    /// A per-kind generation failure (e.g. a personal challenge with no
    /// profile on file) substitutes a temporal challenge, so the set
    /// always contains exactly `n` valid challenges.
    pub fn enrollment_set(&self, n: usize, profile: Option<&UserProfile>) -> Vec<Challenge> {
        const FORCED: [ChallengeKind; 3] = [
            ChallengeKind::Temporal,
            ChallengeKind::VisualCorrelation,
            ChallengeKind::Liveness,
        ];
        const ALL: [ChallengeKind; 6] = [
            ChallengeKind::Temporal,
            ChallengeKind::Personal,
            ChallengeKind::VisualCorrelation,
            ChallengeKind::Liveness,
            ChallengeKind::Multilingual,
            ChallengeKind::Mathematical,
        ];

        let mut kinds: Vec<ChallengeKind> = FORCED.iter().copied().take(n).collect();
        while kinds.len() < n {
            kinds.push(ALL[rand_below(ALL.len() as u32) as usize]);
        }

        let mut set: Vec<Challenge> = kinds
            .into_iter()
            .map(|k| self.generate(k, profile).unwrap_or_else(|_| self.temporal()))
            .collect();
        shuffle(&mut set);
        set
    }

    /// One low-friction challenge for a verification attempt.
    /// Restricted to kinds that need no profile data.
    pub fn verification_challenge(&self) -> Challenge {
        const KINDS: [ChallengeKind; 3] = [
            ChallengeKind::Temporal,
            ChallengeKind::VisualCorrelation,
            ChallengeKind::Mathematical,
        ];
        let kind = KINDS[rand_below(KINDS.len() as u32) as usize];
        // None of these kinds can fail.
        self.generate(kind, None).unwrap_or_else(|_| self.temporal())
    }

    fn generate(
        &self,
        kind: ChallengeKind,
        profile: Option<&UserProfile>,
    ) -> Result<Challenge, ChallengeError> {
        Ok(match kind {
            ChallengeKind::Temporal => self.temporal(),
            ChallengeKind::VisualCorrelation => self.visual(),
            ChallengeKind::Liveness => self.liveness(),
            ChallengeKind::Multilingual => self.multilingual(),
            ChallengeKind::Mathematical => self.mathematical(),
            ChallengeKind::Personal => self.personal(profile)?,
        })
    }

    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        let secs = rand_range(self.cfg.min_validity_secs, self.cfg.max_validity_secs);
        (now, now + chrono::Duration::seconds(secs as i64))
    }

    /// Encodes the exact current time, which a replayed recording
    /// cannot contain.
    fn temporal(&self) -> Challenge {
        let (issued_at, valid_until) = self.window();
        let weekday = issued_at.weekday().to_string().to_lowercase();
        let hour = issued_at.hour();
        let minute = issued_at.minute();
        Challenge {
            phrase: format!(
                "Please say: the time is {hour}:{minute:02} on {weekday}, day {} of the month",
                issued_at.day()
            ),
            kind: ChallengeKind::Temporal,
            difficulty: Difficulty::Easy,
            issued_at,
            valid_until,
            expected: Expected::Keywords(vec![
                hour.to_string(),
                minute.to_string(),
                weekday,
                issued_at.day().to_string(),
            ]),
            display_code: None,
        }
    }

    /// A 4-6 digit code intended for on-screen display only; the audio
    /// channel alone never carries it.
    fn visual(&self) -> Challenge {
        let (issued_at, valid_until) = self.window();
        let len = rand_range(4, 6);
        let code: String = (0..len).map(|_| char::from(b'0' + rand_below(10) as u8)).collect();
        let keywords = code.chars().map(|c| c.to_string()).collect();
        Challenge {
            phrase: "Read aloud the verification code shown on your screen".to_string(),
            kind: ChallengeKind::VisualCorrelation,
            difficulty: Difficulty::Medium,
            issued_at,
            valid_until,
            expected: Expected::Keywords(keywords),
            display_code: Some(code),
        }
    }

    fn liveness(&self) -> Challenge {
        let (issued_at, valid_until) = self.window();
        let p = LIVENESS_PHRASES[rand_below(LIVENESS_PHRASES.len() as u32) as usize];
        let keywords = p
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(str::to_string)
            .collect();
        Challenge {
            phrase: format!("Say '{p}' twice: first slowly, then quickly"),
            kind: ChallengeKind::Liveness,
            difficulty: Difficulty::Hard,
            issued_at,
            valid_until,
            expected: Expected::Keywords(keywords),
            display_code: None,
        }
    }

    fn multilingual(&self) -> Challenge {
        let (issued_at, valid_until) = self.window();
        let (a, b) = MULTILINGUAL_PAIRS[rand_below(MULTILINGUAL_PAIRS.len() as u32) as usize];
        Challenge {
            phrase: format!("Say '{a}', then '{b}'"),
            kind: ChallengeKind::Multilingual,
            difficulty: Difficulty::Hard,
            issued_at,
            valid_until,
            expected: Expected::Keywords(vec![a.to_string(), b.to_string()]),
            display_code: None,
        }
    }

    /// Literal addition or subtraction. Subtraction operands are
    /// reordered so the answer is never negative.
    fn mathematical(&self) -> Challenge {
        let (issued_at, valid_until) = self.window();
        let a = rand_range(1, 20) as i64;
        let b = rand_range(1, 20) as i64;
        let (phrase, answer) = if rand_below(2) == 0 {
            (format!("What is {a} plus {b}?"), a + b)
        } else {
            subtraction(a, b)
        };
        Challenge {
            phrase,
            kind: ChallengeKind::Mathematical,
            difficulty: Difficulty::Medium,
            issued_at,
            valid_until,
            expected: Expected::Number(answer),
            display_code: None,
        }
    }

    fn personal(&self, profile: Option<&UserProfile>) -> Result<Challenge, ChallengeError> {
        let profile =
            profile.ok_or_else(|| ChallengeError::MissingProfile("no profile on file".into()))?;
        if profile.department.is_empty() || profile.work_city.is_empty() {
            return Err(ChallengeError::MissingProfile(
                "department or work city missing".into(),
            ));
        }
        let (issued_at, valid_until) = self.window();
        Ok(Challenge {
            phrase: "Please state your department and the city you work in".to_string(),
            kind: ChallengeKind::Personal,
            difficulty: Difficulty::Medium,
            issued_at,
            valid_until,
            expected: Expected::Keywords(vec![
                profile.department.to_lowercase(),
                profile.work_city.to_lowercase(),
            ]),
            display_code: None,
        })
    }
}

/// Build a subtraction prompt with operands ordered so the answer is
/// non-negative.
fn subtraction(a: i64, b: i64) -> (String, i64) {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    (format!("What is {hi} minus {lo}?"), hi - lo)
}

impl Default for ChallengeGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_set_is_type_diverse() {
        let g = ChallengeGenerator::default();
        let set = g.enrollment_set(5, None);
        assert_eq!(set.len(), 5);

        let kinds: Vec<ChallengeKind> = set.iter().map(|c| c.kind).collect();
        for forced in [
            ChallengeKind::Temporal,
            ChallengeKind::VisualCorrelation,
            ChallengeKind::Liveness,
        ] {
            assert!(kinds.contains(&forced), "missing forced kind {forced}");
        }
    }

    #[test]
    fn enrollment_set_without_profile_never_yields_personal_unanswerable() {
        // Personal challenges require profile data; without it the
        // generator must substitute, never emit an empty expectation.
        let g = ChallengeGenerator::default();
        for _ in 0..20 {
            for c in g.enrollment_set(5, None) {
                match &c.expected {
                    Expected::Keywords(kws) => assert!(!kws.is_empty()),
                    Expected::Number(_) => {}
                }
            }
        }
    }

    #[test]
    fn enrollment_set_respects_small_n() {
        let g = ChallengeGenerator::default();
        assert_eq!(g.enrollment_set(2, None).len(), 2);
    }

    #[test]
    fn inverted_validity_window_collapses_to_lower_bound() {
        let g = ChallengeGenerator::new(GeneratorConfig {
            min_validity_secs: 60,
            max_validity_secs: 30,
        });
        let c = g.verification_challenge();
        assert_eq!((c.valid_until - c.issued_at).num_seconds(), 60);
    }

    #[test]
    fn verification_challenge_is_low_friction() {
        let g = ChallengeGenerator::default();
        for _ in 0..20 {
            let c = g.verification_challenge();
            assert!(matches!(
                c.kind,
                ChallengeKind::Temporal
                    | ChallengeKind::VisualCorrelation
                    | ChallengeKind::Mathematical
            ));
        }
    }

    #[test]
    fn validity_window_within_bounds() {
        let g = ChallengeGenerator::default();
        let c = g.verification_challenge();
        let secs = (c.valid_until - c.issued_at).num_seconds();
        assert!((30..=60).contains(&secs), "window was {secs}s");
    }

    #[test]
    fn visual_code_is_4_to_6_digits() {
        let g = ChallengeGenerator::default();
        for _ in 0..20 {
            let c = g.visual();
            let code = c.display_code.unwrap();
            assert!((4..=6).contains(&code.len()), "code {code}");
            assert!(code.chars().all(|ch| ch.is_ascii_digit()));
        }
    }

    #[test]
    fn subtraction_answer_is_never_negative() {
        let g = ChallengeGenerator::default();
        for _ in 0..100 {
            let c = g.mathematical();
            if let Expected::Number(n) = c.expected {
                assert!(n >= 0, "negative answer from {}", c.phrase);
            }
        }
    }

    #[test]
    fn subtraction_reorders_operands() {
        let (phrase, answer) = subtraction(15, 20);
        assert_eq!(phrase, "What is 20 minus 15?");
        assert_eq!(answer, 5);

        let (phrase, answer) = subtraction(20, 15);
        assert_eq!(phrase, "What is 20 minus 15?");
        assert_eq!(answer, 5);
    }

    #[test]
    fn personal_requires_profile_fields() {
        let g = ChallengeGenerator::default();
        assert!(g.personal(None).is_err());
        assert!(g.personal(Some(&UserProfile::default())).is_err());

        let profile = UserProfile {
            display_name: "Dana".into(),
            department: "Facilities".into(),
            work_city: "Lisbon".into(),
        };
        let c = g.personal(Some(&profile)).unwrap();
        match c.expected {
            Expected::Keywords(kws) => {
                assert!(kws.contains(&"facilities".to_string()));
                assert!(kws.contains(&"lisbon".to_string()));
            }
            _ => panic!("personal challenge must expect keywords"),
        }
    }
}
