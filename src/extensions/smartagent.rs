// SPDX-License-Identifier: Apache-2.0

//! Smart Agent extension.
//!
//! Carries the agent-wide settings (bundle location, host filesystem paths,
//! collectd defaults) that apply across every Smart Agent receiver instance
//! in a process. Receivers discover at most one of these through the host's
//! extension registry; without one, the defaults below apply.

use std::path::PathBuf;

use serde::Deserialize;

use crate::host::Extension;

const DEFAULT_BUNDLE_DIR: &str = "/usr/lib/splunk-otel-collector/agent-bundle";

/// Agent-wide configuration shared by every receiver instance.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SmartAgentConfig {
    /// Location of the extracted agent bundle (collectd, JRE, python runtime).
    pub bundle_dir: PathBuf,
    pub proc_path: PathBuf,
    pub etc_path: PathBuf,
    pub var_path: PathBuf,
    pub run_path: PathBuf,
    pub sys_path: PathBuf,
    pub collectd: CollectdConfig,
}

impl Default for SmartAgentConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from(DEFAULT_BUNDLE_DIR),
            proc_path: PathBuf::from("/proc"),
            etc_path: PathBuf::from("/etc"),
            var_path: PathBuf::from("/var"),
            run_path: PathBuf::from("/run"),
            sys_path: PathBuf::from("/sys"),
            collectd: CollectdConfig::default(),
        }
    }
}

/// Settings for the shared collectd subprocess that collectd-based monitors
/// report through.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectdConfig {
    pub timeout: u32,
    pub read_threads: u32,
    pub write_threads: u32,
    pub write_queue_limit_high: u32,
    pub write_queue_limit_low: u32,
    pub interval_seconds: u32,
    pub log_level: String,
    pub config_dir: PathBuf,
}

impl Default for CollectdConfig {
    fn default() -> Self {
        Self {
            timeout: 40,
            read_threads: 5,
            write_threads: 5,
            write_queue_limit_high: 500_000,
            write_queue_limit_low: 400_000,
            interval_seconds: 10,
            log_level: "notice".to_string(),
            config_dir: PathBuf::from("/var/run/signalfx-agent/collectd"),
        }
    }
}

/// Capability exposed by the Smart Agent extension so receivers can pick up
/// the shared configuration.
pub trait SmartAgentConfigProvider: Send + Sync {
    fn smart_agent_config(&self) -> &SmartAgentConfig;
}

/// The extension itself: a thin holder for [`SmartAgentConfig`].
#[derive(Debug, Default)]
pub struct SmartAgentExtension {
    config: SmartAgentConfig,
}

impl SmartAgentExtension {
    pub fn new(config: SmartAgentConfig) -> Self {
        Self { config }
    }
}

impl SmartAgentConfigProvider for SmartAgentExtension {
    fn smart_agent_config(&self) -> &SmartAgentConfig {
        &self.config
    }
}

impl Extension for SmartAgentExtension {
    fn as_smart_agent_config_provider(&self) -> Option<&dyn SmartAgentConfigProvider> {
        Some(self)
    }
}
