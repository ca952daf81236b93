use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where each host directory lands inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountTargets {
    pub work_dir: String,
    pub pretrained: String,
    pub annotations: String,
    pub output: String,
}

impl Default for MountTargets {
    fn default() -> Self {
        Self {
            work_dir: "/src".to_string(),
            pretrained: "/pretrained".to_string(),
            annotations: "/annotations".to_string(),
            output: "/txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Container CLI used to launch the image.
    pub runtime: String,
    pub image: String,
    pub interpreter: String,
    pub program: String,
    pub mounts: MountTargets,
    /// Forwarded to the program as `--config <path>`, resolved inside the container.
    pub preprocess_config: Option<String>,
    pub ipc_host: bool,
    pub run_as_user: bool,
    pub check_runtime: bool,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    /// Treat a failing container as an error (exit non-zero without `done`).
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "chengyubert:latest".to_string(),
            interpreter: "python".to_string(),
            program: "preprocess.py".to_string(),
            mounts: MountTargets::default(),
            preprocess_config: None,
            ipc_host: true,
            run_as_user: false,
            check_runtime: true,
            timeout_secs: None,
            log_file: None,
            strict: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: Config = serde_yaml::from_str("image: registry.local/idioms:2\n").unwrap();
        assert_eq!(cfg.image, "registry.local/idioms:2");
        assert_eq!(cfg.runtime, "docker");
        assert_eq!(cfg.mounts, MountTargets::default());
        assert!(cfg.ipc_host);
        assert!(!cfg.strict);
    }

    #[test]
    fn nested_mount_override() {
        let cfg: Config = serde_yaml::from_str("mounts:\n  output: /out\n").unwrap();
        assert_eq!(cfg.mounts.output, "/out");
        assert_eq!(cfg.mounts.work_dir, "/src");
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let res: Result<Config, _> = serde_yaml::from_str("timeout_secs: soon\n");
        assert!(res.is_err());
    }
}
