//! Password policy enforcement.
//!
//! Validation never fails: every unmet rule is reported as a [`Violation`] in a
//! fixed order so callers can render all problems at once.

use serde::{Deserialize, Serialize};

const DEFAULT_MIN_LENGTH: usize = 12;

/// Characters counted as special unless the policy says otherwise.
pub const DEFAULT_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Which characters satisfy the special-character rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialChars {
    /// Exactly the listed characters.
    Set(String),
    /// Any ASCII punctuation.
    AsciiPunctuation,
}

impl Default for SpecialChars {
    fn default() -> Self {
        Self::Set(DEFAULT_SPECIAL_CHARS.to_string())
    }
}

impl SpecialChars {
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        match self {
            Self::Set(chars) => chars.contains(ch),
            Self::AsciiPunctuation => ch.is_ascii_punctuation(),
        }
    }
}

/// Rules a candidate password must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    #[serde(default)]
    pub special_chars: SpecialChars,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            special_chars: SpecialChars::default(),
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_uppercase(mut self, required: bool) -> Self {
        self.require_uppercase = required;
        self
    }

    #[must_use]
    pub fn with_lowercase(mut self, required: bool) -> Self {
        self.require_lowercase = required;
        self
    }

    #[must_use]
    pub fn with_digit(mut self, required: bool) -> Self {
        self.require_digit = required;
        self
    }

    #[must_use]
    pub fn with_special(mut self, required: bool) -> Self {
        self.require_special = required;
        self
    }

    #[must_use]
    pub fn with_special_chars(mut self, special_chars: SpecialChars) -> Self {
        self.special_chars = special_chars;
        self
    }
}

/// A single unmet password rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
}

impl Violation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::MissingUppercase => "missing_uppercase",
            Self::MissingLowercase => "missing_lowercase",
            Self::MissingDigit => "missing_digit",
            Self::MissingSpecial => "missing_special",
        }
    }
}

/// Outcome of [`validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

/// Check `password` against `policy`.
///
/// Length is measured in Unicode scalar values. Letter and digit classes are
/// ASCII; special characters come from [`PasswordPolicy::special_chars`].
#[must_use]
pub fn validate(password: &str, policy: &PasswordPolicy) -> PolicyReport {
    let mut violations = Vec::new();

    if password.chars().count() < policy.min_length {
        violations.push(Violation::TooShort);
    }

    let special = |ch: &char| policy.special_chars.contains(*ch);
    let rules: [(bool, &dyn Fn(&char) -> bool, Violation); 4] = [
        (
            policy.require_uppercase,
            &char::is_ascii_uppercase,
            Violation::MissingUppercase,
        ),
        (
            policy.require_lowercase,
            &char::is_ascii_lowercase,
            Violation::MissingLowercase,
        ),
        (
            policy.require_digit,
            &char::is_ascii_digit,
            Violation::MissingDigit,
        ),
        (
            policy.require_special,
            &special,
            Violation::MissingSpecial,
        ),
    ];

    for (required, class, violation) in rules {
        if required && !password.chars().any(|ch| class(&ch)) {
            violations.push(violation);
        }
    }

    PolicyReport {
        valid: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_password_meeting_every_rule() {
        let report = validate("Password123!", &PasswordPolicy::default());
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn short_password_reports_too_short() {
        let report = validate("short1!", &PasswordPolicy::default());
        assert!(!report.valid);
        assert_eq!(
            report.violations,
            vec![Violation::TooShort, Violation::MissingUppercase]
        );
    }

    #[test]
    fn removing_each_class_reports_matching_violation() {
        let policy = PasswordPolicy::default();
        let cases = [
            ("password123!", Violation::MissingUppercase),
            ("PASSWORD123!", Violation::MissingLowercase),
            ("PasswordAbc!", Violation::MissingDigit),
            ("Password1234", Violation::MissingSpecial),
        ];
        for (password, expected) in cases {
            let report = validate(password, &policy);
            assert!(!report.valid, "{password} should be rejected");
            assert_eq!(report.violations, vec![expected], "{password}");
        }
    }

    #[test]
    fn default_special_set_is_narrow() {
        let policy = PasswordPolicy::default();
        for password in ["Password123-", "Password123~", "Password123_"] {
            assert_eq!(
                validate(password, &policy).violations,
                vec![Violation::MissingSpecial],
                "{password}"
            );
        }
        for password in ["Password123\"", "Password123{", "Password123|"] {
            assert!(validate(password, &policy).valid, "{password}");
        }
    }

    #[test]
    fn ascii_punctuation_is_opt_in() {
        let policy =
            PasswordPolicy::default().with_special_chars(SpecialChars::AsciiPunctuation);
        assert!(validate("Password123-", &policy).valid);
        assert!(validate("Password123~", &policy).valid);
        assert!(!validate("Password123é", &policy).valid);
    }

    #[test]
    fn custom_special_set() {
        let policy =
            PasswordPolicy::default().with_special_chars(SpecialChars::Set("-_".to_string()));
        assert!(validate("Password123-", &policy).valid);
        assert!(!validate("Password123!", &policy).valid);
    }

    #[test]
    fn violations_keep_rule_order() {
        let report = validate("", &PasswordPolicy::default());
        assert_eq!(
            report.violations,
            vec![
                Violation::TooShort,
                Violation::MissingUppercase,
                Violation::MissingLowercase,
                Violation::MissingDigit,
                Violation::MissingSpecial,
            ]
        );
    }

    #[test]
    fn disabled_rules_are_ignored() {
        let policy = PasswordPolicy::default()
            .with_min_length(4)
            .with_uppercase(false)
            .with_digit(false)
            .with_special(false);
        assert!(validate("abcd", &policy).valid);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let policy = PasswordPolicy::default()
            .with_min_length(4)
            .with_uppercase(false)
            .with_lowercase(false)
            .with_digit(false)
            .with_special(false);
        // 3 characters, 6 bytes
        assert!(!validate("äöü", &policy).valid);
        assert!(validate("äöüß", &policy).valid);
    }
}
