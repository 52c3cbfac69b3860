//! Required configuration patterns per time-sync package.
//!
//! Server hostnames come from user attributes and are inserted with
//! `regex::escape`, so a hostname containing regex metacharacters can never
//! change the meaning of a pattern.

use crate::control::Assertion;
use crate::profile::{Package, PlatformProfile};
use regex::Regex;
use tsaudit_common::OsFamily;

/// One required (or required-absent) configuration pattern.
pub struct ConfigPattern {
    description: String,
    regex: Regex,
    /// When true the pattern must NOT match for the assertion to pass.
    expect_absent: bool,
}

impl ConfigPattern {
    /// Pattern anchored at line start, multi-line.
    fn line(description: impl Into<String>, raw: &str) -> Self {
        Self {
            description: description.into(),
            regex: compile(&format!("(?m)^{}", raw)),
            expect_absent: false,
        }
    }

    /// Unanchored pattern, matches anywhere in the content.
    fn contains(description: impl Into<String>, raw: &str) -> Self {
        Self {
            description: description.into(),
            regex: compile(raw),
            expect_absent: false,
        }
    }

    /// Line-anchored pattern that must be absent from the content.
    fn absent_line(description: impl Into<String>, raw: &str) -> Self {
        Self {
            description: description.into(),
            regex: compile(&format!("(?m)^{}", raw)),
            expect_absent: true,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate this pattern against config file content.
    pub fn evaluate(&self, content: &str) -> Assertion {
        let matched = self.regex.is_match(content);
        let passed = matched != self.expect_absent;
        let detail = if self.expect_absent {
            format!("forbidden pattern `{}` is present", self.regex.as_str())
        } else {
            format!("no line matching `{}`", self.regex.as_str())
        };
        Assertion::check(self.description.clone(), passed, detail)
    }
}

// Patterns are developer-written (hostnames escaped), so compilation
// failure is a programming error.
pub(crate) fn compile(raw: &str) -> Regex {
    Regex::new(raw).unwrap_or_else(|e| panic!("invalid config pattern `{}`: {}", raw, e))
}

/// The required configuration patterns for a resolved profile.
pub fn required_patterns(profile: &PlatformProfile, os_family: &OsFamily) -> Vec<ConfigPattern> {
    match profile.package {
        Package::Ntp if *os_family == OsFamily::Darwin => ntp_darwin_patterns(),
        Package::Ntp => ntp_patterns(&profile.servers),
        Package::Openntpd => openntpd_patterns(&profile.servers),
        Package::Chrony => chrony_patterns(&profile.servers),
    }
}

fn ntp_darwin_patterns() -> Vec<ConfigPattern> {
    vec![
        ConfigPattern::contains(
            "config restricts default access",
            r"restrict default (kod nomodify notrap nopeer noquery|ignore)",
        ),
        ConfigPattern::contains(
            "config includes /private/etc/ntp.conf",
            &regex::escape("includefile /private/etc/ntp.conf"),
        ),
    ]
}

fn ntp_patterns(servers: &[String]) -> Vec<ConfigPattern> {
    let mut patterns = vec![
        ConfigPattern::line("config disables monitor", "disable monitor"),
        ConfigPattern::line(
            "config restricts default IPv4 access",
            r"(restrict default ignore|restrict -4 default ignore|restrict -4 default kod notrap nomodify nopeer noquery limited)",
        ),
        ConfigPattern::line(
            "config restricts default IPv6 access",
            r"(restrict -6 default ignore|restrict -6 default kod notrap nomodify nopeer noquery limited)",
        ),
        ConfigPattern::line("config allows localhost IPv4", r"restrict 127\.0\.0\.1"),
        ConfigPattern::line("config allows localhost IPv6", r"(restrict -6 ::1|restrict ::1)"),
    ];
    for server in servers {
        let host = regex::escape(server);
        patterns.push(ConfigPattern::line(
            format!("config declares server {}", server),
            &format!("server {}", host),
        ));
        patterns.push(ConfigPattern::line(
            format!("config restricts server {}", server),
            &format!(
                r"restrict {} default.*nomodify (notrap nopeer|nopeer notrap) noquery",
                host
            ),
        ));
    }
    patterns
}

fn openntpd_patterns(servers: &[String]) -> Vec<ConfigPattern> {
    let mut patterns: Vec<ConfigPattern> = servers
        .iter()
        .map(|server| {
            ConfigPattern::line(
                format!("config declares servers {}", server),
                &format!("servers {}", regex::escape(server)),
            )
        })
        .collect();
    patterns.push(ConfigPattern::absent_line(
        "config does not listen on 127.0.0.1",
        r"listen on 127\.0\.0\.1",
    ));
    patterns
}

fn chrony_patterns(servers: &[String]) -> Vec<ConfigPattern> {
    let mut patterns = vec![ConfigPattern::line(
        "config sets local stratum",
        "local stratum",
    )];
    for server in servers {
        patterns.push(ConfigPattern::line(
            format!("config declares server {}", server),
            &format!("server {}", regex::escape(server)),
        ));
    }
    patterns
}
