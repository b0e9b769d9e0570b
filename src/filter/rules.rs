use regex::Regex;

/// What a matching pattern rule does to the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// First match rejects immediately.
    Exclude,
    /// First match accepts immediately.
    Include,
    /// Logs a notice and falls through to the remaining rules.
    Alert,
}

impl RuleAction {
    /// Map a config key (`pattern_exclude`, ...) to its action.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "pattern_exclude" => Some(Self::Exclude),
            "pattern_include" => Some(Self::Include),
            "pattern_alert" => Some(Self::Alert),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::Include => "include",
            Self::Alert => "alert",
        }
    }
}

/// A compiled regular expression tagged with its action.
///
/// Matching is an unanchored search over the bare file name, so `\.tmp$`
/// and `.*\.tmp$` behave the same.
#[derive(Debug, Clone)]
pub struct PatternRule {
    action: RuleAction,
    regex: Regex,
}

impl PatternRule {
    pub fn new(action: RuleAction, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            action,
            regex: Regex::new(pattern)?,
        })
    }

    #[inline]
    pub fn action(&self) -> RuleAction {
        self.action
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    #[inline]
    pub fn is_match(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }
}
