//! The build/push/deploy pipeline and the commands that inspect what it deployed.

pub mod readiness;
pub mod crd;
pub mod build;
pub mod push;
pub mod deploy;
pub mod undeploy;
pub mod status;
pub mod logs;
pub mod events;
pub mod sync;
pub mod init;
pub mod templates;
pub mod update_template;
pub mod watch;

use crate::models::{display_value, AppConfig};

/// Environment handed to template-provided Makefile targets.
///
/// `NAMESPACE` plus every template parameter upper-cased, followed by `extra`.
pub fn custom_target_env(config: &AppConfig, extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = config
        .template_parameters
        .iter()
        .map(|(key, value)| (key.to_uppercase(), display_value(value)))
        .collect();
    env.push(("NAMESPACE".to_string(), config.namespace.clone()));
    env.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    env
}
