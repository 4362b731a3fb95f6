//! OpenSSH executor configuration

use isc_profile::config::constants::providers;
use isc_runner_base::strategies::SystemCommandExecutor;
use std::time::Duration;

/// Create command executor for non-interactive remote reads
pub fn create_ssh_command_executor(timeout: Duration) -> SystemCommandExecutor {
    let mut executor = SystemCommandExecutor::with_timeout(timeout);
    executor.allow_command(providers::SSH);

    for name in providers::SSH_ENV_PASSTHROUGH {
        executor.pass_env(*name);
    }

    executor
}
