// SPDX-License-Identifier: Apache-2.0

//! Process-wide side effects shared by every Smart Agent receiver.
//!
//! One `AgentRuntime` is owned by the factory and handed (Arc) to each
//! receiver; each side effect runs once no matter how many receivers start,
//! and later callers observe the first caller's result.

use std::fs;
use std::path::Path;
use std::sync::{Once, OnceLock};

use tracing::{debug, info, warn};

use crate::extensions::smartagent::{CollectdConfig, SmartAgentConfig};
use crate::host::Host;
use crate::receivers::smartagent::error::StartError;

pub struct AgentRuntime {
    agent_config: OnceLock<SmartAgentConfig>,
    log_redirect: Once,
    env_setup: Once,
    collectd_setup: OnceLock<Result<(), String>>,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self {
            agent_config: OnceLock::new(),
            log_redirect: Once::new(),
            env_setup: Once::new(),
            collectd_setup: OnceLock::new(),
        }
    }
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// The agent-wide config, resolved once from the host's extensions.
    /// With several Smart Agent extensions registered the last one in
    /// component-ID order wins; with none, defaults apply.
    pub fn agent_config(&self, host: &Host) -> &SmartAgentConfig {
        self.agent_config.get_or_init(|| {
            let providers: Vec<_> = host
                .extensions()
                .iter()
                .filter_map(|(id, ext)| {
                    ext.as_smart_agent_config_provider()
                        .map(|provider| (id, provider))
                })
                .collect();

            match providers.last() {
                Some((id, provider)) => {
                    if providers.len() > 1 {
                        warn!(
                            used = %id,
                            "multiple smart agent extensions registered, using the last"
                        );
                    }
                    provider.smart_agent_config().clone()
                }
                None => SmartAgentConfig::default(),
            }
        })
    }

    /// Route the `log` facade into `tracing` so monitors built against the
    /// legacy logger land in the collector's structured output. Safe to call
    /// from every start; repeat installs are ignored.
    pub fn redirect_legacy_logs(&self) {
        self.log_redirect.call_once(|| {
            if let Err(err) = tracing_log::LogTracer::init() {
                debug!(%err, "legacy log redirection already installed");
            }
        });
    }

    /// Export the host-path environment variables monitors read. Variables
    /// already present in the process are left alone so external overrides
    /// stick.
    pub fn setup_environment(&self, config: &SmartAgentConfig) {
        self.env_setup.call_once(|| {
            #[cfg(not(windows))]
            set_if_unset("JAVA_HOME", &config.bundle_dir.join("jre"));

            set_if_unset("HOST_PROC", &config.proc_path);
            set_if_unset("HOST_ETC", &config.etc_path);
            set_if_unset("HOST_VAR", &config.var_path);
            set_if_unset("HOST_RUN", &config.run_path);
            set_if_unset("HOST_SYS", &config.sys_path);
        });
    }

    /// Lay down the collectd config tree for collectd-based monitors. Runs
    /// once; a failure is returned to the first caller and every later one.
    pub fn configure_collectd(&self, config: &SmartAgentConfig) -> Result<(), StartError> {
        self.collectd_setup
            .get_or_init(|| {
                write_collectd_config(&config.collectd).map_err(|err| err.to_string())
            })
            .clone()
            .map_err(StartError::Collectd)
    }
}

fn set_if_unset(key: &str, value: &Path) {
    if std::env::var_os(key).is_some() {
        info!(key, "environment variable already set, honoring the override");
        return;
    }
    std::env::set_var(key, value);
}

fn write_collectd_config(config: &CollectdConfig) -> std::io::Result<()> {
    let managed_dir = config.config_dir.join("managed_config");
    fs::create_dir_all(&managed_dir)?;

    let rendered = format!(
        "Interval {}\n\
         Timeout {}\n\
         ReadThreads {}\n\
         WriteThreads {}\n\
         WriteQueueLimitHigh {}\n\
         WriteQueueLimitLow {}\n\
         LogLevel \"{}\"\n\
         CollectInternalStats false\n\
         Include \"{}/*.conf\"\n",
        config.interval_seconds,
        config.timeout,
        config.read_threads,
        config.write_threads,
        config.write_queue_limit_high,
        config.write_queue_limit_low,
        config.log_level,
        managed_dir.display(),
    );

    fs::write(config.config_dir.join("collectd.conf"), rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::smartagent::SmartAgentExtension;
    use crate::host::ComponentId;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn defaults_without_extension() {
        let runtime = AgentRuntime::new();
        let config = runtime.agent_config(&Host::new());
        assert_eq!(SmartAgentConfig::default(), *config);
    }

    #[test]
    fn last_extension_wins() {
        let mut host = Host::new();
        for (name, bundle) in [("a", "/bundle/a"), ("b", "/bundle/b")] {
            let config = SmartAgentConfig {
                bundle_dir: PathBuf::from(bundle),
                ..Default::default()
            };
            host.register_extension(
                ComponentId::with_name("smartagent", name),
                Arc::new(SmartAgentExtension::new(config)),
            );
        }

        let runtime = AgentRuntime::new();
        assert_eq!(
            PathBuf::from("/bundle/b"),
            runtime.agent_config(&host).bundle_dir
        );
    }

    #[test]
    fn agent_config_resolved_once() {
        let runtime = AgentRuntime::new();
        runtime.agent_config(&Host::new());

        let mut host = Host::new();
        host.register_extension(
            ComponentId::new("smartagent"),
            Arc::new(SmartAgentExtension::new(SmartAgentConfig {
                bundle_dir: PathBuf::from("/late"),
                ..Default::default()
            })),
        );

        // second resolution returns the first result
        assert_eq!(
            SmartAgentConfig::default().bundle_dir,
            runtime.agent_config(&host).bundle_dir
        );
    }

    #[test]
    fn existing_environment_is_honored() {
        std::env::set_var("HOST_SYS", "/custom/sys");
        let runtime = AgentRuntime::new();
        runtime.setup_environment(&SmartAgentConfig::default());
        assert_eq!("/custom/sys", std::env::var("HOST_SYS").unwrap());
    }

    #[test]
    fn collectd_config_rendered_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = SmartAgentConfig {
            collectd: CollectdConfig {
                config_dir: dir.path().join("collectd"),
                ..Default::default()
            },
            ..Default::default()
        };

        let runtime = AgentRuntime::new();
        runtime.configure_collectd(&config).unwrap();

        let rendered = fs::read_to_string(dir.path().join("collectd/collectd.conf")).unwrap();
        assert!(rendered.contains("ReadThreads 5"));
        assert!(rendered.contains("WriteQueueLimitHigh 500000"));
        assert!(dir.path().join("collectd/managed_config").is_dir());

        // a second call with a different directory is a no-op
        let other = SmartAgentConfig {
            collectd: CollectdConfig {
                config_dir: dir.path().join("other"),
                ..Default::default()
            },
            ..Default::default()
        };
        runtime.configure_collectd(&other).unwrap();
        assert!(!dir.path().join("other").exists());
    }
}
