//! Live synchronization control.

use crate::control::{Assertion, Control, ControlContext};
use crate::patterns::compile;
use crate::profile::{Package, PlatformProfile};
use async_trait::async_trait;
use regex::Regex;
use tsaudit_common::{Error, OsFamily};

/// Query the running daemon's status tool and require a sync-confirmed
/// marker on stdout, an empty stderr and a zero exit code. Unlike the
/// drift and process controls this one also runs inside container guests;
/// the status tools answer wherever a daemon is declared. A command
/// timeout is a failed assertion, never fatal.
pub struct LiveSyncControl;

struct SyncProbe {
    command: &'static str,
    markers: Vec<(String, Regex)>,
}

fn probes(profile: &PlatformProfile, os_family: &OsFamily) -> Vec<SyncProbe> {
    match profile.package {
        Package::Ntp => {
            let mut probes = vec![SyncProbe {
                command: "ntpstat",
                markers: vec![(
                    "reports synchronised".to_string(),
                    compile("synchronised to"),
                )],
            }];
            // timedatectl only exists on systemd hosts.
            if *os_family != OsFamily::Darwin {
                probes.push(SyncProbe {
                    command: "timedatectl status",
                    markers: vec![
                        ("reports NTP enabled".to_string(), compile("NTP enabled: yes")),
                        (
                            "reports NTP synchronized".to_string(),
                            compile("NTP synchronized: yes"),
                        ),
                    ],
                });
            }
            probes
        }
        Package::Openntpd => vec![SyncProbe {
            command: "ntpctl -s status",
            markers: vec![("reports clock synced".to_string(), compile("clock synced"))],
        }],
        Package::Chrony => vec![SyncProbe {
            command: "chronyc tracking",
            markers: vec![(
                "reports normal leap status".to_string(),
                compile(r"Leap status\s*:\s*Normal"),
            )],
        }],
    }
}

#[async_trait]
impl Control for LiveSyncControl {
    fn id(&self) -> &str {
        "timesync-6.0"
    }

    fn title(&self) -> &str {
        "time-sync daemon should be synchronized"
    }

    fn only_if(&self, ctx: &ControlContext<'_>) -> bool {
        ctx.profile.as_managed().is_some()
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let Some(profile) = ctx.profile.as_managed() else {
            return Vec::new();
        };

        let mut assertions = Vec::new();
        for probe in probes(profile, &ctx.facts.os.family) {
            let cmd = probe.command;
            match ctx.inspector.run_command(cmd, ctx.settings.command_timeout).await {
                Ok(out) => {
                    for (what, marker) in &probe.markers {
                        assertions.push(Assertion::check(
                            format!("`{}` {}", cmd, what),
                            marker.is_match(&out.stdout),
                            format!("stdout was: {}", truncate(&out.stdout)),
                        ));
                    }
                    assertions.push(Assertion::check(
                        format!("`{}` writes no errors", cmd),
                        out.stderr.is_empty(),
                        format!("stderr was: {}", truncate(&out.stderr)),
                    ));
                    assertions.push(Assertion::check(
                        format!("`{}` exits zero", cmd),
                        out.exit_code == Some(0),
                        match out.exit_code {
                            Some(code) => format!("exit code {}", code),
                            None => "terminated by signal".to_string(),
                        },
                    ));
                }
                Err(e @ Error::CommandTimeout { .. }) => {
                    for (what, _) in &probe.markers {
                        assertions.push(Assertion::fail(
                            format!("`{}` {}", cmd, what),
                            e.to_string(),
                        ));
                    }
                    assertions.push(Assertion::fail(
                        format!("`{}` writes no errors", cmd),
                        e.to_string(),
                    ));
                    assertions.push(Assertion::fail(format!("`{}` exits zero", cmd), e.to_string()));
                }
                Err(e) => {
                    for (what, _) in &probe.markers {
                        assertions
                            .push(Assertion::inspection_error(format!("`{}` {}", cmd, what), &e));
                    }
                    assertions.push(Assertion::inspection_error(
                        format!("`{}` writes no errors", cmd),
                        &e,
                    ));
                    assertions
                        .push(Assertion::inspection_error(format!("`{}` exits zero", cmd), &e));
                }
            }
        }
        assertions
    }
}

// Cut on a char boundary; command output is arbitrary UTF-8.
fn truncate(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    match trimmed.char_indices().nth(120) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
