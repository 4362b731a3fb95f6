//! Compile-time constants shared across the workspace

pub mod profile {
    /// Maximum profile document size accepted by the loader (1MB)
    pub const MAX_PROFILE_SIZE: u64 = 1024 * 1024;

    /// Maximum controls per profile
    pub const MAX_CONTROLS: usize = 256;

    /// Maximum expectations bound to one resource group
    pub const MAX_EXPECTATIONS_PER_GROUP: usize = 128;

    /// Template variable naming the current `for_each` item
    pub const ITEM_VARIABLE: &str = "item";

    /// Template variable naming the current `for_each` key (mappings only)
    pub const KEY_VARIABLE: &str = "key";
}

pub mod inputs {
    /// Prefix of environment variables overriding input values
    pub const ENV_PREFIX: &str = "ISC_INPUT_";
}

pub mod readiness {
    /// Seconds an instance must have existed before onboarding is considered complete
    pub const ONBOARDING_SECS: u64 = 360;
}

pub mod runner {
    /// Upper bound on worker threads regardless of detected parallelism
    pub const MAX_WORKER_THREADS: usize = 32;

    /// Default per-command timeout for provider CLIs, in seconds
    pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

    /// Search path given to provider subprocesses
    pub const RESTRICTED_PATH: &str = "/usr/bin:/bin:/usr/sbin:/sbin";

    /// Environment variable overriding the worker thread count
    pub const MAX_THREADS_ENV: &str = "ISC_MAX_THREADS";

    /// Environment variable setting a run-level timeout in seconds
    pub const TIMEOUT_ENV: &str = "ISC_TIMEOUT_SECS";
}

pub mod providers {
    /// Google Cloud CLI used by the compute instance fetcher
    pub const GCLOUD: &str = "gcloud";

    /// OpenSSH client used for remote operating system checks
    pub const SSH: &str = "ssh";

    /// Extra directory searched for `gcloud`, e.g. an SDK install prefix
    pub const GCLOUD_PATH_ENV: &str = "ISC_GCLOUD_PATH";

    /// Variables `gcloud` needs to find its credentials and configuration
    pub const GCLOUD_ENV_PASSTHROUGH: &[&str] = &[
        "HOME",
        "CLOUDSDK_CONFIG",
        "CLOUDSDK_CORE_PROJECT",
        "GOOGLE_APPLICATION_CREDENTIALS",
    ];

    /// Variables `ssh` needs to reach an agent and its known hosts
    pub const SSH_ENV_PASSTHROUGH: &[&str] = &["HOME", "USER", "SSH_AUTH_SOCK"];

    /// Release file read on local and remote hosts
    pub const OS_RELEASE_PATH: &str = "/etc/os-release";
}
