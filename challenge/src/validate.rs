use chrono::{DateTime, Utc};

use voxauth_analysis::FraudIndicator;

use crate::types::{Challenge, ChallengeOutcome, Difficulty, Expected};

/// Validate a transcribed response against a challenge.
///
/// Expiry is checked first and short-circuits: a response after
/// `valid_until` is rejected as "Challenge expired" without looking at
/// the content, so "too slow" stays a distinct fraud signal from
/// "wrong answer". Validation never returns an error; malformed
/// challenges produce a `NoMatch` tagged `ValidationError`.
pub fn validate_response(
    challenge: &Challenge,
    spoken_text: &str,
    now: DateTime<Utc>,
) -> ChallengeOutcome {
    if challenge.expired_at(now) {
        return ChallengeOutcome::Expired {
            reason: "Challenge expired".to_string(),
            indicator: FraudIndicator::ResponseTooSlow,
        };
    }

    let text = spoken_text.to_lowercase();
    match &challenge.expected {
        Expected::Keywords(keywords) => validate_keywords(challenge, keywords, &text),
        Expected::Number(answer) => validate_number(*answer, &text),
    }
}

fn validate_keywords(challenge: &Challenge, keywords: &[String], text: &str) -> ChallengeOutcome {
    if keywords.is_empty() {
        return ChallengeOutcome::NoMatch {
            confidence: 0.0,
            reason: "Challenge carries no expected keywords".to_string(),
            indicator: FraudIndicator::ValidationError,
        };
    }

    let matched = keywords
        .iter()
        .filter(|k| text.contains(k.to_lowercase().as_str()))
        .count();
    let ratio = matched as f32 / keywords.len() as f32;
    let threshold = match challenge.difficulty {
        Difficulty::Hard => 0.7,
        _ => 0.6,
    };

    if ratio >= threshold {
        ChallengeOutcome::Matched { confidence: ratio }
    } else {
        ChallengeOutcome::NoMatch {
            confidence: ratio,
            reason: format!(
                "Expected content not found: {matched} of {} keywords present",
                keywords.len()
            ),
            indicator: FraudIndicator::ChallengeMismatch,
        }
    }
}

fn validate_number(answer: i64, text: &str) -> ChallengeOutcome {
    let digits = answer.to_string();
    let spoken = number_words(answer);
    let matched = contains_standalone(text, &digits)
        || spoken.as_deref().is_some_and(|w| text.contains(w));

    if matched {
        ChallengeOutcome::Matched { confidence: 1.0 }
    } else {
        ChallengeOutcome::NoMatch {
            confidence: 0.0,
            reason: "Expected numeric answer not found".to_string(),
            indicator: FraudIndicator::ChallengeMismatch,
        }
    }
}

/// Match a digit string only on token boundaries so "5" does not match
/// inside "15".
fn contains_standalone(text: &str, digits: &str) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .any(|tok| tok == digits)
}

/// English word form for small answers (addition of operands up to 20
/// stays within 40). Returns `None` outside the covered range.
fn number_words(n: i64) -> Option<String> {
    const ONES: [&str; 20] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen",
    ];
    const TENS: [&str; 3] = ["twenty", "thirty", "forty"];

    match n {
        0..=19 => Some(ONES[n as usize].to_string()),
        20..=40 => {
            let tens = TENS[(n / 10 - 2) as usize];
            let rem = n % 10;
            if rem == 0 {
                Some(tens.to_string())
            } else {
                Some(format!("{tens} {}", ONES[rem as usize]))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChallengeKind;
    use chrono::Duration;

    fn keyword_challenge(keywords: &[&str], difficulty: Difficulty) -> Challenge {
        let now = Utc::now();
        Challenge {
            phrase: "test".into(),
            kind: ChallengeKind::Temporal,
            difficulty,
            issued_at: now,
            valid_until: now + Duration::seconds(45),
            expected: Expected::Keywords(keywords.iter().map(|s| s.to_string()).collect()),
            display_code: None,
        }
    }

    #[test]
    fn expired_rejected_even_with_perfect_content() {
        let c = keyword_challenge(&["monday", "10", "30"], Difficulty::Easy);
        let late = c.valid_until + Duration::seconds(1);
        let out = validate_response(&c, "it is 10 30 on monday", late);
        match out {
            ChallengeOutcome::Expired { reason, indicator } => {
                assert_eq!(reason, "Challenge expired");
                assert_eq!(indicator, FraudIndicator::ResponseTooSlow);
            }
            other => panic!("expected Expired, got {other:?}"),
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let c = keyword_challenge(&["monday", "10", "30"], Difficulty::Easy);
        let out = validate_response(&c, "The time is 10:30 on MONDAY", Utc::now());
        assert!(out.matched());
        assert!((out.confidence() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_match_below_threshold_fails() {
        let c = keyword_challenge(&["alpha", "beta", "gamma", "delta"], Difficulty::Easy);
        // 1 of 4 = 0.25 < 0.6.
        let out = validate_response(&c, "alpha only", Utc::now());
        assert!(!out.matched());
        assert_eq!(out.fraud_indicator(), Some(FraudIndicator::ChallengeMismatch));
    }

    #[test]
    fn hard_difficulty_raises_threshold() {
        // 2 of 3 ~= 0.67: passes Medium (0.6) but fails Hard (0.7).
        let medium = keyword_challenge(&["alpha", "beta", "gamma"], Difficulty::Medium);
        assert!(validate_response(&medium, "alpha beta", Utc::now()).matched());

        let hard = keyword_challenge(&["alpha", "beta", "gamma"], Difficulty::Hard);
        assert!(!validate_response(&hard, "alpha beta", Utc::now()).matched());
    }

    #[test]
    fn empty_keywords_yield_validation_error() {
        let c = keyword_challenge(&[], Difficulty::Easy);
        let out = validate_response(&c, "anything", Utc::now());
        assert_eq!(out.fraud_indicator(), Some(FraudIndicator::ValidationError));
    }

    #[test]
    fn numeric_answer_matches_digits_and_words() {
        let now = Utc::now();
        let c = Challenge {
            phrase: "What is 20 minus 15?".into(),
            kind: ChallengeKind::Mathematical,
            difficulty: Difficulty::Medium,
            issued_at: now,
            valid_until: now + Duration::seconds(45),
            expected: Expected::Number(5),
            display_code: None,
        };
        assert!(validate_response(&c, "the answer is 5", now).matched());
        assert!(validate_response(&c, "five", now).matched());
        assert!(!validate_response(&c, "the answer is 15", now).matched());
        assert!(!validate_response(&c, "six", now).matched());
    }

    #[test]
    fn number_words_cover_sum_range() {
        assert_eq!(number_words(0).as_deref(), Some("zero"));
        assert_eq!(number_words(21).as_deref(), Some("twenty one"));
        assert_eq!(number_words(40).as_deref(), Some("forty"));
        assert_eq!(number_words(41), None);
    }
}
