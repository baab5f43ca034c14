//! In-memory platform for tests and hosts without Android tooling.
//!
//! Every accessor answers from state the test sets up front.  Individual
//! queries can be made to fail, and subprocesses can be made to hang, so the
//! fault paths of the probes are exercisable without a device.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use devtrust_core::BuildProperty;

use crate::application::platform::{CommandOutput, PlatformAccessor, PlatformError};

#[derive(Default)]
struct MockState {
    properties: HashMap<BuildProperty, String>,
    failing_properties: HashSet<BuildProperty>,
    files: HashSet<String>,
    denied_paths: HashSet<String>,
    packages: HashSet<String>,
    settings: HashMap<String, i64>,
    failing_settings: HashSet<String>,
    network_operator: Option<String>,
    commands: HashMap<String, CommandOutput>,
    hang_commands: bool,
    package_latency: Option<Duration>,
    debuggable: bool,
}

/// A scriptable [`PlatformAccessor`].
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
    command_calls: AtomicU32,
    operator_lookups: AtomicU32,
}

impl MockPlatform {
    /// A platform with every attribute empty and nothing installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean retail handset: release-keys, no root, developer options off.
    pub fn pixel() -> Self {
        let mock = Self::new();
        for (p, v) in [
            (BuildProperty::Manufacturer, "Google"),
            (BuildProperty::Model, "Pixel 8"),
            (BuildProperty::Brand, "google"),
            (BuildProperty::Device, "shiba"),
            (BuildProperty::Product, "shiba"),
            (
                BuildProperty::Fingerprint,
                "google/shiba/shiba:14/AP1A.240305.019/11445710:user/release-keys",
            ),
            (BuildProperty::Tags, "release-keys"),
            (BuildProperty::Type, "user"),
            (BuildProperty::Release, "14"),
            (BuildProperty::SdkInt, "34"),
        ] {
            mock.set_property(p, v);
        }
        mock
    }

    /// A stock Android Studio emulator image.
    pub fn studio_emulator() -> Self {
        let mock = Self::pixel();
        for (p, v) in [
            (BuildProperty::Model, "sdk_gphone64_x86_64"),
            (BuildProperty::Device, "emu64xa"),
            (BuildProperty::Product, "sdk_gphone64_x86_64"),
            (
                BuildProperty::Fingerprint,
                "google/sdk_gphone64_x86_64/emu64xa:14/UE1A.230829.036/10762838:user/release-keys",
            ),
        ] {
            mock.set_property(p, v);
        }
        mock.set_network_operator(Some("Android"));
        mock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().expect("lock poisoned"))
    }

    pub fn set_property(&self, property: BuildProperty, value: &str) {
        self.with_state(|s| {
            s.failing_properties.remove(&property);
            s.properties.insert(property, value.to_string());
        });
    }

    /// Makes reads of `property` fail with a permission error.
    pub fn fail_property(&self, property: BuildProperty) {
        self.with_state(|s| {
            s.failing_properties.insert(property);
        });
    }

    pub fn add_file(&self, path: &str) {
        self.with_state(|s| {
            s.files.insert(path.to_string());
        });
    }

    /// Makes existence checks for `path` fail with a permission error.
    pub fn deny_path(&self, path: &str) {
        self.with_state(|s| {
            s.denied_paths.insert(path.to_string());
        });
    }

    pub fn add_package(&self, package_id: &str) {
        self.with_state(|s| {
            s.packages.insert(package_id.to_string());
        });
    }

    pub fn set_setting(&self, key: &str, value: i64) {
        self.with_state(|s| {
            s.failing_settings.remove(key);
            s.settings.insert(key.to_string(), value);
        });
    }

    pub fn fail_setting(&self, key: &str) {
        self.with_state(|s| {
            s.failing_settings.insert(key.to_string());
        });
    }

    pub fn set_network_operator(&self, name: Option<&str>) {
        self.with_state(|s| s.network_operator = name.map(str::to_string));
    }

    /// Scripts the result of running `program`.
    pub fn set_command_output(&self, program: &str, success: bool, stdout: &str) {
        self.with_state(|s| {
            s.commands.insert(
                program.to_string(),
                CommandOutput {
                    success,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            );
        });
    }

    /// Makes every subprocess hang forever.
    pub fn hang_commands(&self) {
        self.with_state(|s| s.hang_commands = true);
    }

    /// Makes every package lookup block the calling thread for `latency`,
    /// as `pm` does while the package service is still starting.
    pub fn set_package_latency(&self, latency: Duration) {
        self.with_state(|s| s.package_latency = Some(latency));
    }

    pub fn set_debuggable(&self, debuggable: bool) {
        self.with_state(|s| s.debuggable = debuggable);
    }

    /// Number of subprocesses started so far.
    pub fn command_calls(&self) -> u32 {
        self.command_calls.load(Ordering::SeqCst)
    }

    /// Number of telephony operator lookups made so far.
    pub fn operator_lookups(&self) -> u32 {
        self.operator_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformAccessor for MockPlatform {
    fn file_exists(&self, path: &str) -> Result<bool, PlatformError> {
        self.with_state(|s| {
            if s.denied_paths.contains(path) {
                Err(PlatformError::PermissionDenied(path.to_string()))
            } else {
                Ok(s.files.contains(path))
            }
        })
    }

    async fn run_command(
        &self,
        program: &str,
        _args: &[&str],
    ) -> Result<CommandOutput, PlatformError> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        let (hang, scripted) =
            self.with_state(|s| (s.hang_commands, s.commands.get(program).cloned()));
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(scripted.unwrap_or_default())
    }

    fn build_property(&self, property: BuildProperty) -> Result<String, PlatformError> {
        self.with_state(|s| {
            if s.failing_properties.contains(&property) {
                Err(PlatformError::PermissionDenied(
                    property.system_property_key().to_string(),
                ))
            } else {
                Ok(s.properties.get(&property).cloned().unwrap_or_default())
            }
        })
    }

    fn package_installed(&self, package_id: &str) -> Result<bool, PlatformError> {
        let (latency, installed) =
            self.with_state(|s| (s.package_latency, s.packages.contains(package_id)));
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        Ok(installed)
    }

    fn global_setting_int(&self, key: &str) -> Result<Option<i64>, PlatformError> {
        self.with_state(|s| {
            if s.failing_settings.contains(key) {
                Err(PlatformError::PermissionDenied(key.to_string()))
            } else {
                Ok(s.settings.get(key).copied())
            }
        })
    }

    fn network_operator_name(&self) -> Result<Option<String>, PlatformError> {
        self.operator_lookups.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| Ok(s.network_operator.clone()))
    }

    fn app_is_debuggable(&self) -> Result<bool, PlatformError> {
        self.with_state(|s| Ok(s.debuggable))
    }
}
