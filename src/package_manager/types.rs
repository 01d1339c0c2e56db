//! PackageManager 相关数据类型定义

use super::evr::Evr;
use std::process::Output;

/// 命令输出结果（stdout 与 stderr 合并）
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub output: String,
    /// 进程退出码；被信号终止时为 None
    pub status: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(o: Output) -> Self {
        Self {
            output: String::from_utf8_lossy(&o.stdout).to_string(),
            status: o.status.code(),
        }
    }
}

/// 一条包记录（可更新的包，或按名称匹配到的包）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    /// 缺省时为 "0"
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    /// 是否允许同时安装多个版本，仅按名称查询时计算
    pub multi_install: Option<bool>,
}

impl PackageRecord {
    pub fn new(name: &str, epoch: &str, version: &str, release: &str, arch: &str) -> Self {
        Self {
            name: name.to_string(),
            epoch: if epoch.is_empty() {
                "0".to_string()
            } else {
                epoch.to_string()
            },
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
            multi_install: None,
        }
    }

    /// `name.arch`，同名不同架构视为不同的包
    pub fn id(&self) -> String {
        format!("{}.{}", self.name, self.arch)
    }

    pub fn evr(&self) -> Evr {
        Evr::new(&self.epoch, &self.version, &self.release)
    }
}
