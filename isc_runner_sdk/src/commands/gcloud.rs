//! Google Cloud CLI executor configuration

use isc_profile::config::constants::providers;
use isc_runner_base::strategies::SystemCommandExecutor;
use std::time::Duration;

/// Create command executor for `gcloud compute` queries
///
/// Only `gcloud` is whitelisted. Credentials are found through `HOME` and
/// the `CLOUDSDK_*` variables, which are passed through when set. An SDK
/// installed outside the restricted path can be added with `ISC_GCLOUD_PATH`.
pub fn create_gcloud_command_executor(timeout: Duration) -> SystemCommandExecutor {
    let mut executor = SystemCommandExecutor::with_timeout(timeout);
    executor.allow_command(providers::GCLOUD);

    for name in providers::GCLOUD_ENV_PASSTHROUGH {
        executor.pass_env(*name);
    }
    executor.set_env("CLOUDSDK_CORE_DISABLE_PROMPTS", "1");

    if let Ok(extra) = std::env::var(providers::GCLOUD_PATH_ENV) {
        for dir in extra.split(':') {
            executor.extend_path(dir);
        }
    }

    executor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcloud_executor_whitelist() {
        let executor = create_gcloud_command_executor(Duration::from_secs(30));

        assert!(executor.is_allowed("gcloud"));
        assert_eq!(executor.default_timeout(), Duration::from_secs(30));

        assert!(!executor.is_allowed("ssh"));
        assert!(!executor.is_allowed("curl"));
    }
}
