//! Operating system fetcher
//!
//! Reads `/etc/os-release` on the local host, or on a remote host through
//! `ssh -o BatchMode=yes <target> cat /etc/os-release`.
//!
//! Locator: `host` is `local`/`localhost` or an ssh target (`host` or
//! `user@host`); optional `user` and `port` are passed to ssh.

use isc_profile::config::constants::providers;
use isc_profile::model::{LocatorError, ResourceDescriptor, ResourceType, Value};
use isc_runner_base::strategies::{FetchError, ResourceFetcher, SystemCommandExecutor};
use isc_runner_base::types::ResourceSnapshot;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

const TARGET_PATTERN: &str = r"^[A-Za-z0-9_.\[\]:%-]+(@[A-Za-z0-9_.\[\]:%-]+)?$";

pub struct OperatingSystemFetcher {
    id: String,
    executor: SystemCommandExecutor,
    release_path: PathBuf,
}

impl OperatingSystemFetcher {
    pub fn new(executor: SystemCommandExecutor) -> Self {
        Self {
            id: "os_release_fetcher".to_string(),
            executor,
            release_path: PathBuf::from(providers::OS_RELEASE_PATH),
        }
    }

    /// Read local release information from another file
    pub fn with_release_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.release_path = path.into();
        self
    }

    fn read_local(&self) -> Result<String, FetchError> {
        std::fs::read_to_string(&self.release_path).map_err(|e| {
            FetchError::provider(
                &self.id,
                format!("failed to read {}: {}", self.release_path.display(), e),
            )
        })
    }

    fn read_remote(&self, descriptor: &ResourceDescriptor, target: &str) -> Result<String, FetchError> {
        validate_target(target)?;

        let mut args: Vec<String> = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if let Some(port) = descriptor.get("port") {
            port.parse::<u16>().map_err(|_| LocatorError::Malformed {
                value: port.to_string(),
                reason: "port must be an integer in 1-65535".to_string(),
            })?;
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(user) = descriptor.get("user") {
            validate_target(user)?;
            args.push("-l".to_string());
            args.push(user.to_string());
        }
        args.push(target.to_string());
        args.push("cat".to_string());
        args.push(providers::OS_RELEASE_PATH.to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        isc_profile::log_debug!("Reading remote os-release", "target" => target);

        let output = self
            .executor
            .execute(providers::SSH, &arg_refs, None)
            .map_err(|e| FetchError::from_command(&self.id, e))?;

        if !output.success() {
            let reason = output
                .stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("no error output");
            return Err(FetchError::provider(
                &self.id,
                format!("ssh {} exited with {}: {}", target, output.exit_code, reason),
            ));
        }
        Ok(output.stdout)
    }
}

impl ResourceFetcher for OperatingSystemFetcher {
    fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ResourceSnapshot, FetchError> {
        let host = descriptor.require("host")?.trim();
        let content = if is_local(host) {
            self.read_local()?
        } else {
            self.read_remote(descriptor, host)?
        };
        os_snapshot(&content)
    }

    fn resource_types(&self) -> Vec<ResourceType> {
        vec![ResourceType::OperatingSystem]
    }

    fn fetcher_id(&self) -> &str {
        &self.id
    }
}

fn is_local(host: &str) -> bool {
    matches!(host, "local" | "localhost")
}

/// Reject targets ssh could read as options
fn validate_target(target: &str) -> Result<(), LocatorError> {
    let pattern = Regex::new(TARGET_PATTERN).map_err(|e| LocatorError::Malformed {
        value: target.to_string(),
        reason: e.to_string(),
    })?;
    if target.starts_with('-') || !pattern.is_match(target) {
        return Err(LocatorError::Malformed {
            value: target.to_string(),
            reason: "not a valid ssh target".to_string(),
        });
    }
    Ok(())
}

/// Parse os-release `KEY=value` lines; quotes are stripped
pub fn parse_os_release(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), unquoted.replace("\\\"", "\""))
        })
        .collect()
}

/// Family name for an os-release `ID` and its `ID_LIKE` list
pub fn os_family(id: &str, id_like: &[&str]) -> &'static str {
    let known = |candidate: &str| match candidate {
        "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn" => Some("redhat"),
        "debian" | "ubuntu" | "raspbian" => Some("debian"),
        "suse" | "sles" | "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => Some("suse"),
        "arch" | "manjaro" => Some("arch"),
        "alpine" => Some("alpine"),
        _ => None,
    };
    std::iter::once(id)
        .chain(id_like.iter().copied())
        .find_map(known)
        .unwrap_or("linux")
}

pub fn os_snapshot(content: &str) -> Result<ResourceSnapshot, FetchError> {
    let fields = parse_os_release(content);
    let id = fields
        .get("ID")
        .map(|id| id.to_ascii_lowercase())
        .ok_or_else(|| FetchError::parse("os-release has no ID field"))?;
    let id_like: Vec<&str> = fields
        .get("ID_LIKE")
        .map(|like| like.split_whitespace().collect())
        .unwrap_or_default();

    let mut snapshot = ResourceSnapshot::present(BTreeMap::new())
        .with_attribute("family", os_family(&id, &id_like))
        .with_attribute(
            "id_like",
            Value::Sequence(id_like.iter().map(|s| Value::from(*s)).collect()),
        )
        .with_attribute("name", id.as_str());

    for (attribute, key) in [
        ("release", "VERSION_ID"),
        ("pretty_name", "PRETTY_NAME"),
        ("version", "VERSION"),
    ] {
        if let Some(value) = fields.get(key) {
            snapshot = snapshot.with_attribute(attribute, value.as_str());
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const CENTOS: &str = r#"NAME="CentOS Linux"
VERSION="7 (Core)"
ID="centos"
ID_LIKE="rhel fedora"
VERSION_ID="7"
PRETTY_NAME="CentOS Linux 7 (Core)"
# comment
ANSI_COLOR="0;31"
"#;

    #[test]
    fn test_parse_os_release() {
        let fields = parse_os_release(CENTOS);
        assert_eq!(fields.get("ID").map(String::as_str), Some("centos"));
        assert_eq!(fields.get("VERSION").map(String::as_str), Some("7 (Core)"));
        assert!(!fields.contains_key("# comment"));
    }

    #[test]
    fn test_os_snapshot_attributes() {
        let snapshot = os_snapshot(CENTOS).unwrap();
        assert_eq!(snapshot.get("name"), Some(&Value::from("centos")));
        assert_eq!(snapshot.get("family"), Some(&Value::from("redhat")));
        assert_eq!(snapshot.get("release"), Some(&Value::from("7")));
        assert_eq!(
            snapshot.get("id_like"),
            Some(&Value::Sequence(vec![Value::from("rhel"), Value::from("fedora")]))
        );
    }

    #[test]
    fn test_family_falls_back_through_id_like() {
        assert_eq!(os_family("pop", &["ubuntu", "debian"]), "debian");
        assert_eq!(os_family("nixos", &[]), "linux");
        assert_matches!(os_snapshot("NAME=x\n"), Err(FetchError::Parse { .. }));
    }

    #[test]
    fn test_local_fetch_reads_release_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ID=ubuntu\nVERSION_ID=\"22.04\"\n").unwrap();

        let fetcher =
            OperatingSystemFetcher::new(SystemCommandExecutor::new()).with_release_path(file.path());
        let descriptor = ResourceDescriptor::new(ResourceType::OperatingSystem, BTreeMap::new())
            .with("host", "local");
        let snapshot = fetcher.fetch(&descriptor).unwrap();
        assert_eq!(snapshot.get("name"), Some(&Value::from("ubuntu")));
        assert_eq!(snapshot.get("family"), Some(&Value::from("debian")));
    }

    #[test]
    fn test_rejects_option_like_targets() {
        assert!(validate_target("admin@10.0.0.4").is_ok());
        assert!(validate_target("bigip-mgmt.example.com").is_ok());
        assert!(validate_target("-oProxyCommand=sh").is_err());
        assert!(validate_target("host; rm -rf /").is_err());

        let fetcher = OperatingSystemFetcher::new(SystemCommandExecutor::new());
        let descriptor = ResourceDescriptor::new(ResourceType::OperatingSystem, BTreeMap::new())
            .with("host", "-oProxyCommand=sh");
        assert_matches!(
            fetcher.fetch(&descriptor),
            Err(FetchError::InvalidLocator(_))
        );
    }

    #[test]
    fn test_remote_read_requires_whitelisted_ssh() {
        let fetcher = OperatingSystemFetcher::new(SystemCommandExecutor::new());
        let descriptor = ResourceDescriptor::new(ResourceType::OperatingSystem, BTreeMap::new())
            .with("host", "bigip.example.com");
        assert_matches!(
            fetcher.fetch(&descriptor),
            Err(FetchError::Provider { reason, .. }) if reason.contains("not in whitelist")
        );
    }
}
