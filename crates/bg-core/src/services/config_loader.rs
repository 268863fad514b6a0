use std::path::Path;

use crate::error::{DeployError, Result};
use crate::models::{DeployConfig, ProbeKind};

pub const DEFAULT_CONFIG_FILENAME: &str = "bluegreen.yaml";

/// Load and validate a config file. Relative `state_dir` and
/// `proxy.config_path` are resolved against the directory holding the config.
pub fn load(config_path: &Path) -> Result<DeployConfig> {
    if !config_path.exists() {
        return Err(DeployError::ConfigNotFound(config_path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(config_path)?;
    let mut config = parse(&contents)?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    if config.state_dir.is_relative() {
        config.state_dir = base.join(&config.state_dir);
    }
    if let Some(proxy) = config.proxy.as_mut() {
        if proxy.config_path.is_relative() {
            proxy.config_path = base.join(&proxy.config_path);
        }
    }
    Ok(config)
}

pub fn parse(contents: &str) -> Result<DeployConfig> {
    let config: DeployConfig = serde_yaml::from_str(contents)
        .map_err(|e| DeployError::InvalidConfig(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &DeployConfig) -> Result<()> {
    if config.runtime.command.is_empty() || config.runtime.command[0].is_empty() {
        return Err(DeployError::InvalidConfig(
            "runtime.command must name an executable".into(),
        ));
    }
    let blue = &config.slots.blue;
    let green = &config.slots.green;
    if blue.container.is_empty() || green.container.is_empty() {
        return Err(DeployError::InvalidConfig(
            "both slots need a container name".into(),
        ));
    }
    if blue.container == green.container {
        return Err(DeployError::InvalidConfig(format!(
            "blue and green share container name '{}'",
            blue.container
        )));
    }
    if blue.address() == green.address() {
        return Err(DeployError::InvalidConfig(format!(
            "blue and green share address {}",
            blue.address()
        )));
    }
    if config.readiness.timeout_secs == 0 {
        return Err(DeployError::InvalidConfig(
            "readiness.timeout_secs must be greater than zero".into(),
        ));
    }
    if config.readiness.kind == ProbeKind::Http && !config.readiness.path.starts_with('/') {
        return Err(DeployError::InvalidConfig(format!(
            "readiness.path must start with '/', got '{}'",
            config.readiness.path
        )));
    }
    if let Some(proxy) = &config.proxy {
        if proxy.reload_command.is_empty() {
            return Err(DeployError::InvalidConfig(
                "proxy.reload_command must not be empty".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotColor;
    use std::fs;

    #[test]
    fn parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"
runtime:
  command: ["podman"]
slots:
  blue: { container: app-blue, port: 8001 }
  green: { container: app-green, port: 8002, host: 10.0.0.5 }
readiness:
  kind: tcp
  timeout_secs: 10
proxy:
  config_path: /etc/nginx/conf.d/upstream.conf
  reload_command: ["nginx", "-s", "reload"]
state_dir: /var/lib/bluegreen
"#;
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, yaml).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.runtime.command, vec!["podman"]);
        assert_eq!(config.slot(SlotColor::Green).address(), "10.0.0.5:8002");
        assert_eq!(config.readiness.kind, ProbeKind::Tcp);
        assert_eq!(config.readiness.timeout_secs, 10);
        assert_eq!(config.readiness.interval_ms, 500);
        assert_eq!(config.proxy.unwrap().reload_command.len(), 3);
        assert_eq!(config.state_dir, Path::new("/var/lib/bluegreen"));
    }

    #[test]
    fn parse_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "slots:\n  blue: { container: b, port: 8001 }\n  green: { container: g, port: 8002 }\n";
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, yaml).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.runtime.command, vec!["docker"]);
        assert_eq!(config.readiness.kind, ProbeKind::Http);
        assert!(config.proxy.is_none());
        assert_eq!(config.state_dir, dir.path().join(".bluegreen"));
    }

    #[test]
    fn missing_config_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join(DEFAULT_CONFIG_FILENAME)),
            Err(DeployError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn example_config_is_valid() {
        let config = parse(include_str!("../../../../bluegreen.example.yaml")).unwrap();
        assert!(config.proxy.is_some());
        assert_eq!(config.slot(SlotColor::Blue).container, "photo-guests-blue");
    }

    #[test]
    fn rejects_shared_container_name() {
        let yaml = "slots:\n  blue: { container: app, port: 8001 }\n  green: { container: app, port: 8002 }\n";
        assert!(matches!(parse(yaml), Err(DeployError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_shared_address() {
        let yaml = "slots:\n  blue: { container: b, port: 8001 }\n  green: { container: g, port: 8001 }\n";
        assert!(matches!(parse(yaml), Err(DeployError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_relative_readiness_path() {
        let yaml = "slots:\n  blue: { container: b, port: 8001 }\n  green: { container: g, port: 8002 }\nreadiness:\n  path: health\n";
        match parse(yaml) {
            Err(DeployError::InvalidConfig(message)) => assert!(message.contains("readiness.path")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let tcp = "slots:\n  blue: { container: b, port: 8001 }\n  green: { container: g, port: 8002 }\nreadiness:\n  kind: tcp\n  path: health\n";
        assert!(parse(tcp).is_ok());
    }

    #[test]
    fn rejects_empty_reload_command() {
        let yaml = "slots:\n  blue: { container: b, port: 8001 }\n  green: { container: g, port: 8002 }\nproxy:\n  config_path: up.conf\n  reload_command: []\n";
        assert!(matches!(parse(yaml), Err(DeployError::InvalidConfig(_))));
    }
}
