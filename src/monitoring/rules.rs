//! Pattern rule tables for SSH authentication logs
//!
//! Both built-in tables share the same rule bodies and only differ in the
//! leading prefix (timestamp and host identity). Order matters: the first rule
//! that matches a line wins, so specific rules come before general ones.

use std::str::FromStr;

use regex::Regex;

use crate::event::{EventKind, Field};

/// Classic syslog prefix: `Jan 10 03:14:07 host1 ` or `2024-01-10T03:14:07+00:00 host1 `
const SYSLOG_PREFIX: &str =
    r"^(?P<ts>[A-Z][a-z]{2} \d{1,2} \d{2}:\d{2}:\d{2}|\d{4}-\d{2}-\d{2}T\S+)\s+(?P<server_name>\S+)\s+";

/// Remote syslog template: `<ISO ts> <server ip> <server name> `
const FORWARDED_PREFIX: &str = r"^(?P<ts>\S+)\s+(?P<server_ip>\S+)\s+(?P<server_name>\S+)\s+";

const SSHD: &str = r"sshd(?:\[\d+\])?:\s+";

const CLIENT: &str = r"(?P<client_ip>\S+)\s+port\s+(?P<port>\d+)";

/// Auth method applied to PAM session lines
const PAM: &str = "PAM";

/// Which built-in rule table to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleSet {
    /// Local syslog files (`/var/log/auth.log`)
    #[default]
    Syslog,
    /// Lines collected from several hosts with the server IP in the prefix
    Forwarded,
}

impl RuleSet {
    fn prefix(&self) -> &'static str {
        match self {
            RuleSet::Syslog => SYSLOG_PREFIX,
            RuleSet::Forwarded => FORWARDED_PREFIX,
        }
    }

    /// Compile the ordered rule table for this log layout
    pub fn rules(&self) -> Result<Vec<PatternRule>, regex::Error> {
        let prefix = self.prefix();
        let body = |pattern: &str| format!("{}{}", prefix, pattern);

        Ok(vec![
            PatternRule::new(
                EventKind::Accepted,
                &body(&format!(
                    r"{SSHD}Accepted\s+(?P<auth_type>\S+)\s+for\s+(?P<username>\S+)\s+from\s+{CLIENT}"
                )),
            )?,
            PatternRule::new(
                EventKind::Failed,
                &body(&format!(
                    r"{SSHD}Failed\s+(?P<auth_type>publickey|keyboard-interactive/pam|hostbased|gssapi-with-mic|none)\s+for\s+(?:invalid user\s+)?(?P<username>\S+)\s+from\s+{CLIENT}"
                )),
            )?,
            PatternRule::new(
                EventKind::Failed,
                &body(&format!(
                    r"{SSHD}Failed\s+password\s+for\s+(?:invalid user\s+)?(?P<username>\S+)\s+from\s+{CLIENT}"
                )),
            )?,
            PatternRule::new(
                EventKind::Disconnected,
                &body(&format!(
                    r"{SSHD}Disconnected\s+from\s+(?:(?:invalid|authenticating)\s+)?(?:user\s+(?P<username>\S+)\s+)?{CLIENT}"
                )),
            )?,
            PatternRule::new(
                EventKind::Error,
                &body(&format!(r"{SSHD}error:\s+(?:.*?\bfrom\s+{CLIENT})?")),
            )?,
            PatternRule::new(
                EventKind::SessionOpened,
                &body(r".*session opened for user (?P<username>[^\s(]+)"),
            )?
            .with_fixed(Field::AuthMethod, PAM),
            PatternRule::new(
                EventKind::SessionClosed,
                &body(r".*session closed for user (?P<username>[^\s(]+)"),
            )?
            .with_fixed(Field::AuthMethod, PAM),
        ])
    }
}

impl FromStr for RuleSet {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "syslog" => Ok(RuleSet::Syslog),
            "forwarded" => Ok(RuleSet::Forwarded),
            _ => Err("invalid rule set: expected 'syslog' or 'forwarded'"),
        }
    }
}

/// One ordered classification rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    kind: EventKind,
    matcher: Regex,
    fixed_fields: Vec<(Field, &'static str)>,
}

impl PatternRule {
    pub fn new(kind: EventKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            matcher: Regex::new(pattern)?,
            fixed_fields: Vec::new(),
        })
    }

    /// Give a field a constant value instead of a capture
    pub fn with_fixed(mut self, field: Field, value: &'static str) -> Self {
        self.fixed_fields.push((field, value));
        self
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    pub fn fixed_fields(&self) -> &[(Field, &'static str)] {
        &self.fixed_fields
    }
}
