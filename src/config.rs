use crate::package_manager::RepoOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/rpm-updates/config.toml";
pub const CONFIG_ENV: &str = "RPM_UPDATES_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub yum: String,
    pub repoquery: String,
    pub rpm: String,
    pub yum_conf: PathBuf,
    pub lock_path: PathBuf,
    /// 查询前是否获取包数据库锁
    pub use_lock: bool,
    pub lock_attempts: u32,
    pub lock_delay_secs: u64,
    /// false 时总是走 `yum check-update` 回退路径
    pub prefer_library: bool,
    pub enablerepo: Vec<String>,
    pub disablerepo: Vec<String>,
    pub disableexcludes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            yum: "yum".to_string(),
            repoquery: "repoquery".to_string(),
            rpm: "rpm".to_string(),
            yum_conf: PathBuf::from("/etc/yum.conf"),
            lock_path: PathBuf::from("/var/run/yum.pid"),
            use_lock: true,
            lock_attempts: 10,
            lock_delay_secs: 2,
            prefer_library: true,
            enablerepo: Vec::new(),
            disablerepo: Vec::new(),
            disableexcludes: Vec::new(),
        }
    }
}

impl Config {
    /// 配置文件路径优先级：参数 > 环境变量 > 默认路径
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            log::debug!("已加载配置 {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn lock_delay(&self) -> Duration {
        Duration::from_secs(self.lock_delay_secs)
    }

    pub fn repo_options(&self) -> RepoOptions {
        RepoOptions {
            disablerepo: self.disablerepo.clone(),
            enablerepo: self.enablerepo.clone(),
            disableexcludes: self.disableexcludes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "use_lock = false\nlock_attempts = 3\nenablerepo = [\"epel\"]\n",
        )
        .unwrap();
        let config = Config::load_or_default(Some(&path)).unwrap();
        assert!(!config.use_lock);
        assert_eq!(config.lock_attempts, 3);
        assert_eq!(config.yum, "yum");
        assert_eq!(config.repo_options().enablerepo, vec!["epel".to_string()]);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "lock_attempts = \"many\"\n").unwrap();
        assert!(Config::load_or_default(Some(&path)).is_err());
    }
}
