//! Android platform accessor built on the stock shell tools.
//!
//! Reads the device through the same command-line tools available in any
//! Android shell:
//!
//! | Query              | Tool                                           |
//! |--------------------|------------------------------------------------|
//! | build properties   | `getprop ro.build.fingerprint`, ...            |
//! | global settings    | `settings get global adb_enabled`              |
//! | installed packages | `pm path <package>`                            |
//! | operator name      | `getprop gsm.operator.alpha`                   |
//! | app debuggable     | `dumpsys package <package>` (`DEBUGGABLE` flag) |
//! | file existence     | `std::fs::metadata` / `test -e` over adb       |
//!
//! The adapter runs either directly on the device ([`ShellTarget::Local`])
//! or from a workstation through `adb shell` ([`ShellTarget::Adb`]).
//!
//! `run_command` spawns through `tokio::process` with `kill_on_drop`, so a
//! caller that gives up on the future (for example on timeout) also kills
//! the child process.
//!
//! The synchronous queries behind the other accessors run under a per-query
//! deadline ([`DEFAULT_QUERY_TIMEOUT`] unless configured): a tool that has
//! not exited by then is killed and the query fails with
//! [`PlatformError::CallFailed`].  `pm` in particular can hang while the
//! package service is still starting.

use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use devtrust_core::BuildProperty;
use tracing::debug;

use crate::application::platform::{CommandOutput, PlatformAccessor, PlatformError};

/// Where shell commands execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellTarget {
    /// On the device itself.
    Local,
    /// Through `adb shell`, optionally pinned to one device serial.
    Adb { serial: Option<String> },
}

/// Default deadline for one synchronous query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// How often a running query is polled for exit.
const QUERY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// [`PlatformAccessor`] backed by `getprop`, `settings`, `pm` and `dumpsys`.
pub struct AndroidShellPlatform {
    target: ShellTarget,
    /// Package id of the hosting application, used for the debuggable check.
    app_package: Option<String>,
    query_timeout: Duration,
}

impl AndroidShellPlatform {
    pub fn new(target: ShellTarget, app_package: Option<String>) -> Self {
        Self {
            target,
            app_package,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Replaces the per-query deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builds the full argv for `program args...` on the configured target.
    fn argv(&self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        let rest = args.iter().map(|a| a.to_string());
        match &self.target {
            ShellTarget::Local => (program.to_string(), rest.collect()),
            ShellTarget::Adb { serial } => {
                let mut argv = Vec::new();
                if let Some(s) = serial {
                    argv.push("-s".to_string());
                    argv.push(s.clone());
                }
                argv.push("shell".to_string());
                argv.push(program.to_string());
                argv.extend(rest);
                ("adb".to_string(), argv)
            }
        }
    }

    /// Runs a short tool synchronously, killing it at the query deadline.
    fn run_sync(&self, program: &str, args: &[&str]) -> Result<Output, PlatformError> {
        let (bin, argv) = self.argv(program, args);
        let failed = |e: std::io::Error| PlatformError::CallFailed(format!("{bin} {program}: {e}"));

        let mut child = Command::new(&bin)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(failed)?;
        // Drain both pipes while waiting so a chatty tool cannot block on a
        // full pipe buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.query_timeout;
        let status = loop {
            match child.try_wait().map_err(failed)? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    // Already-exited races are harmless; the result is a timeout.
                    let _ = child.kill();
                    let _ = child.wait();
                    let timeout_ms = self.query_timeout.as_millis() as u64;
                    debug!(program, timeout_ms, "query killed");
                    return Err(PlatformError::CallFailed(format!(
                        "{program}: no answer within {timeout_ms} ms"
                    )));
                }
                None => thread::sleep(QUERY_POLL_INTERVAL),
            }
        };

        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    /// Runs a tool and returns its trimmed stdout, failing on non-zero exit.
    fn query(&self, program: &str, args: &[&str]) -> Result<String, PlatformError> {
        let output = self.run_sync(program, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(program, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn getprop(&self, key: &str) -> Result<String, PlatformError> {
        self.query("getprop", &[key])
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    reader.join().unwrap_or_default()
}

/// Maps a failed tool's stderr to the closest [`PlatformError`].
fn classify_failure(program: &str, stderr: &str) -> PlatformError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("permission denied") || lower.contains("securityexception") {
        PlatformError::PermissionDenied(format!("{program}: {stderr}"))
    } else if lower.contains("not found") {
        PlatformError::Unsupported(format!("{program}: {stderr}"))
    } else {
        PlatformError::CallFailed(format!("{program}: {stderr}"))
    }
}

/// Parses `settings get` output; the tool prints `null` for unset keys.
fn parse_setting(raw: &str) -> Result<Option<i64>, PlatformError> {
    match raw.trim() {
        "" | "null" => Ok(None),
        v => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| PlatformError::CallFailed(format!("non-integer setting value '{v}'"))),
    }
}

/// Returns whether a `dumpsys package` dump lists the `DEBUGGABLE` flag.
fn dump_has_debuggable_flag(dump: &str) -> bool {
    dump.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("flags=") || l.starts_with("pkgFlags="))
        .any(|l| l.contains(" DEBUGGABLE "))
}

#[async_trait]
impl PlatformAccessor for AndroidShellPlatform {
    fn file_exists(&self, path: &str) -> Result<bool, PlatformError> {
        match &self.target {
            ShellTarget::Local => match std::fs::symlink_metadata(path) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    Err(PlatformError::PermissionDenied(path.to_string()))
                }
                Err(e) => Err(PlatformError::CallFailed(format!("{path}: {e}"))),
            },
            ShellTarget::Adb { .. } => {
                // `test` exits 1 for "absent", which is an answer, not a fault.
                let output = self.run_sync("test", &["-e", path])?;
                Ok(output.status.success())
            }
        }
    }

    async fn run_command(
        &self,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, PlatformError> {
        let (bin, argv) = self.argv(program, args);
        debug!(program = %bin, args = ?argv, "spawning subprocess");
        let output = tokio::process::Command::new(&bin)
            .args(&argv)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PlatformError::CallFailed(format!("{bin}: {e}")))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn build_property(&self, property: BuildProperty) -> Result<String, PlatformError> {
        self.getprop(property.system_property_key())
    }

    fn package_installed(&self, package_id: &str) -> Result<bool, PlatformError> {
        // `pm path` prints `package:/data/app/...` and exits 0 only when the
        // package resolves.
        let output = self.run_sync("pm", &["path", package_id])?;
        Ok(output.status.success()
            && String::from_utf8_lossy(&output.stdout)
                .lines()
                .any(|l| l.starts_with("package:")))
    }

    fn global_setting_int(&self, key: &str) -> Result<Option<i64>, PlatformError> {
        parse_setting(&self.query("settings", &["get", "global", key])?)
    }

    fn network_operator_name(&self) -> Result<Option<String>, PlatformError> {
        let name = self.getprop("gsm.operator.alpha")?;
        // Multi-SIM devices report a comma-separated list; the first slot is
        // the default voice operator.
        let first = name.split(',').next().unwrap_or_default().trim();
        Ok((!first.is_empty()).then(|| first.to_string()))
    }

    fn app_is_debuggable(&self) -> Result<bool, PlatformError> {
        let package = self
            .app_package
            .as_deref()
            .ok_or_else(|| PlatformError::Unsupported("no hosting app package configured".into()))?;
        let dump = self.query("dumpsys", &["package", package])?;
        Ok(dump_has_debuggable_flag(&dump))
    }
}
