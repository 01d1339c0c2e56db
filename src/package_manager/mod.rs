//! 包管理器模块 — 对 yum / repoquery / rpm 的封装

pub mod evr;
pub mod fallback;
pub mod lock;
pub mod parser;
pub mod repoquery;
pub mod types;

pub use repoquery::RepoQuerySession;
pub use types::{CommandOutput, PackageRecord};

use crate::error::{LockFailure, QueryError};
use std::path::Path;
use std::process::Command;

/// 检查命令是否在 PATH 中；带路径的命令直接检查文件
pub fn command_exists(command: &str) -> bool {
    if command.contains('/') {
        return Path::new(command).is_file();
    }
    Command::new("which")
        .arg(command)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// 包管理器日志的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Null,
    Stderr,
}

/// 会话上强制覆盖的包管理器选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub debug_level: u8,
    pub error_level: u8,
    /// 是否显示同一个包的多个版本
    pub show_duplicates: bool,
    pub log_sink: LogSink,
}

impl SessionOptions {
    /// 列出更新：静默、不显示重复版本
    pub fn updates() -> Self {
        Self {
            debug_level: 0,
            error_level: 0,
            show_duplicates: false,
            log_sink: LogSink::Null,
        }
    }

    /// 按名称列出所有包：需要看到每一个版本
    pub fn all_packages() -> Self {
        Self {
            show_duplicates: true,
            ..Self::updates()
        }
    }
}

/// 包管理器的代际，打开会话时确定一次
///
/// 旧版本不会隐式初始化仓库和包索引（sack），需要显式调用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Legacy,
    Modern,
}

impl Generation {
    /// 根据 `yum --version` 第一行判断：3.2 之前为 Legacy
    pub fn from_version(version: &str) -> Option<Self> {
        let first = version.lines().next()?.trim();
        let mut parts = first.split('.');
        let major: u32 = parts.next()?.trim().parse().ok()?;
        let minor: u32 = parts
            .next()
            .and_then(|m| m.trim().parse().ok())
            .unwrap_or(0);
        if (major, minor) < (3, 2) {
            Some(Generation::Legacy)
        } else {
            Some(Generation::Modern)
        }
    }
}

/// repoquery 的命令行方言
///
/// dnf 提供的 yum / repoquery 不认识 `--pkgnarrow`，改用 `--upgrades` 等选项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Yum,
    Dnf,
}

impl Dialect {
    /// 根据 `yum --version` 第一行判断：dnf 的版本号从 4 开始，dnf5 直接打印名称
    pub fn from_version(version: &str) -> Self {
        let first = version.lines().next().unwrap_or("").trim();
        let major = first
            .split('.')
            .next()
            .and_then(|m| m.trim().parse::<u32>().ok());
        if first.contains("dnf") || major.is_some_and(|m| m >= 4) {
            Dialect::Dnf
        } else {
            Dialect::Yum
        }
    }
}

/// 请求的包列表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrow {
    Updates,
    All,
}

/// 转发给包管理器的仓库选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoOptions {
    pub disablerepo: Vec<String>,
    pub enablerepo: Vec<String>,
    pub disableexcludes: Vec<String>,
}

impl RepoOptions {
    /// 参数顺序：--disablerepo, --enablerepo, --disableexcludes
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(self.disablerepo.iter().map(|r| format!("--disablerepo={}", r)));
        args.extend(self.enablerepo.iter().map(|r| format!("--enablerepo={}", r)));
        args.extend(
            self.disableexcludes
                .iter()
                .map(|r| format!("--disableexcludes={}", r)),
        );
        args
    }
}

/// 查询结果流：遍历过程中也可能出错
pub type Packages = Box<dyn Iterator<Item = Result<PackageRecord, QueryError>>>;

/// 一次包管理器会话
///
/// setup_* 必须按 config → transaction → rpmdb（→ repos → sack）的顺序调用；
/// close_rpmdb / unlock 由 `query::OpenSession` 负责调用。
#[cfg_attr(test, mockall::automock)]
pub trait Session {
    fn generation(&self) -> Generation;

    fn apply_overrides(&mut self, options: &SessionOptions);

    fn setup_config(&mut self) -> Result<(), QueryError>;

    fn setup_transaction(&mut self) -> Result<(), QueryError>;

    fn setup_rpmdb(&mut self) -> Result<(), QueryError>;

    /// 仅 Legacy 需要
    fn setup_repos(&mut self) -> Result<(), QueryError>;

    /// 仅 Legacy 需要
    fn setup_sack(&mut self) -> Result<(), QueryError>;

    /// 尝试加锁一次
    fn lock(&mut self) -> Result<(), LockFailure>;

    fn unlock(&mut self);

    fn close_rpmdb(&mut self);

    fn packages(&mut self, narrow: Narrow) -> Result<Packages, QueryError>;

    fn allows_multiple_installs(&self, package: &PackageRecord) -> bool;
}
