//! Event classifier
//!
//! Turns a single raw log line into at most one [`Event`] by trying an ordered
//! rule table. Classification is a pure function of the line and the table.

use crate::event::{Event, Field};
use crate::monitoring::rules::{PatternRule, RuleSet};
use crate::utils::AppError;

/// Classification seam used by the pipeline driver
pub trait LineClassifier: Send + Sync {
    /// Returns `None` when no rule matches the line
    fn classify(&self, line: &str) -> Option<Event>;
}

/// Ordered, first-match rule classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<PatternRule>,
}

impl Classifier {
    /// Build a classifier from one of the built-in rule tables
    pub fn new(rule_set: RuleSet) -> Result<Self, AppError> {
        Ok(Self::with_rules(rule_set.rules()?))
    }

    /// Build a classifier from a custom rule table, most specific rule first
    pub fn with_rules(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn classify(&self, line: &str) -> Option<Event> {
        let normalized = normalize_whitespace(line);

        self.rules.iter().find_map(|rule| {
            let captures = rule.matcher().captures(&normalized)?;

            let mut event = Event::new(rule.kind().clone(), line);
            for field in Field::ALL {
                if let Some(value) = captures.name(field.capture_name()) {
                    event.set_field(field, value.as_str());
                }
            }
            fill_defaults(rule, &mut event);

            Some(event)
        })
    }
}

impl LineClassifier for Classifier {
    fn classify(&self, line: &str) -> Option<Event> {
        Classifier::classify(self, line)
    }
}

/// Apply the rule's fixed fields, then the kind's default auth method
fn fill_defaults(rule: &PatternRule, event: &mut Event) {
    for (field, value) in rule.fixed_fields() {
        event.set_field(*field, value);
    }

    if !event.has_field(Field::AuthMethod) {
        if let Some(method) = event.kind.default_auth_method() {
            event.set_field(Field::AuthMethod, method);
        }
    }
}

/// Collapse tabs and repeated spaces into single spaces and trim the ends
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
