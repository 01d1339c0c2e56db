//! 基于查询接口的会话：rpm 数据库快照 + repoquery 机器可读输出

use super::lock::PidLock;
use super::parser::{
    parse_install_only, parse_query_line, parse_query_output, DEFAULT_INSTALL_ONLY, QUERY_FORMAT,
};
use super::types::{CommandOutput, PackageRecord};
use super::{
    command_exists, Dialect, Generation, LogSink, Narrow, Packages, RepoOptions, Session, SessionOptions,
};
use crate::config::Config;
use crate::error::{LockFailure, QueryError};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct RepoQuerySession {
    yum: String,
    repoquery: String,
    rpm: String,
    yum_conf: PathBuf,
    lock_path: PathBuf,
    repos: RepoOptions,
    generation: Generation,
    dialect: Dialect,
    options: SessionOptions,
    install_only: Vec<String>,
    repo_args: Vec<String>,
    /// rpm 数据库快照，None 表示未打开或已关闭
    installed: Option<Vec<PackageRecord>>,
    /// 仓库中所有可用包（仅 Legacy）
    sack: Option<Vec<PackageRecord>>,
    lock: Option<PidLock>,
}

impl RepoQuerySession {
    /// 查询接口是否可用
    pub fn available(config: &Config) -> bool {
        config.prefer_library && command_exists(&config.repoquery)
    }

    /// 打开会话，并根据 `yum --version` 确定代际和 repoquery 方言
    pub fn open(config: &Config, repos: RepoOptions) -> Result<Self, QueryError> {
        let out: CommandOutput = duct::cmd(config.yum.as_str(), ["--version"])
            .stdout_capture()
            .stderr_null()
            .unchecked()
            .run()?
            .into();
        let dialect = Dialect::from_version(&out.output);
        let generation = match dialect {
            Dialect::Dnf => Some(Generation::Modern),
            Dialect::Yum => Generation::from_version(&out.output),
        }
        .ok_or_else(|| {
            QueryError::Attribute(format!(
                "cannot determine {} version from '{}'",
                config.yum,
                out.output.lines().next().unwrap_or("").trim()
            ))
        })?;
        log::debug!("{} 代际: {:?}, 方言: {:?}", config.yum, generation, dialect);
        let mut session = Self::with_generation(config, repos, generation);
        session.dialect = dialect;
        Ok(session)
    }

    pub fn with_generation(config: &Config, repos: RepoOptions, generation: Generation) -> Self {
        Self {
            yum: config.yum.clone(),
            repoquery: config.repoquery.clone(),
            rpm: config.rpm.clone(),
            yum_conf: config.yum_conf.clone(),
            lock_path: config.lock_path.clone(),
            repos,
            generation,
            dialect: Dialect::Yum,
            options: SessionOptions::updates(),
            install_only: Vec::new(),
            repo_args: Vec::new(),
            installed: None,
            sack: None,
            lock: None,
        }
    }

    /// 运行命令并返回 stdout，非零退出视为 I/O 失败
    fn capture(&self, program: &str, args: Vec<String>) -> Result<String, QueryError> {
        log::debug!("执行: {} {}", program, args.join(" "));
        let expr = duct::cmd(program, args).stdout_capture().unchecked();
        let expr = match self.options.log_sink {
            LogSink::Null => expr.stderr_null(),
            LogSink::Stderr => expr,
        };
        let output = expr.run()?;
        if !output.status.success() {
            return Err(QueryError::Io {
                errno: 0,
                message: format!("{} exited with {}", program, output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn repoquery_args(&self, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "-q".to_string(),
            "--qf".to_string(),
            QUERY_FORMAT.to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args.extend(self.repo_args.iter().cloned());
        args
    }

    /// Modern 代际直接向 repoquery 请求结果列表
    fn query_args(&self, narrow: Narrow) -> Vec<String> {
        let mut extra = match (self.dialect, narrow) {
            (Dialect::Yum, Narrow::Updates) => vec!["-a", "--pkgnarrow=updates"],
            (Dialect::Yum, Narrow::All) => vec!["-a", "--pkgnarrow=all"],
            (Dialect::Dnf, Narrow::Updates) => vec!["--upgrades"],
            (Dialect::Dnf, Narrow::All) => vec!["--all"],
        };
        match self.dialect {
            Dialect::Yum if self.options.show_duplicates => extra.push("--show-duplicates"),
            Dialect::Yum => {}
            // dnf 默认列出所有版本
            Dialect::Dnf if !self.options.show_duplicates => extra.push("--latest-limit=1"),
            Dialect::Dnf => {}
        }
        self.repoquery_args(&extra)
    }

    fn modern_packages(&self, narrow: Narrow) -> Result<Packages, QueryError> {
        let output = self.capture(&self.repoquery, self.query_args(narrow))?;
        let lines: Vec<String> = output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect();
        Ok(Box::new(lines.into_iter().map(|l| parse_query_line(&l))))
    }

    fn legacy_packages(
        &self,
        installed: &[PackageRecord],
        narrow: Narrow,
    ) -> Result<Packages, QueryError> {
        let sack = self
            .sack
            .as_ref()
            .ok_or_else(|| QueryError::Attribute("package sack is not set up".to_string()))?;
        let records = match narrow {
            Narrow::Updates => updates_from_sack(installed, sack),
            Narrow::All => all_packages(installed, sack, self.options.show_duplicates),
        };
        Ok(Box::new(records.into_iter().map(Ok)))
    }
}

impl Session for RepoQuerySession {
    fn generation(&self) -> Generation {
        self.generation
    }

    fn apply_overrides(&mut self, options: &SessionOptions) {
        self.options = options.clone();
    }

    fn setup_config(&mut self) -> Result<(), QueryError> {
        self.install_only = match fs::read_to_string(&self.yum_conf) {
            Ok(conf) => parse_install_only(&conf),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("{} 不存在，使用默认配置", self.yum_conf.display());
                None
            }
            Err(e) => return Err(e.into()),
        }
        .unwrap_or_else(|| DEFAULT_INSTALL_ONLY.iter().map(|s| s.to_string()).collect());
        Ok(())
    }

    fn setup_transaction(&mut self) -> Result<(), QueryError> {
        self.repo_args = self.repos.to_args();
        Ok(())
    }

    fn setup_rpmdb(&mut self) -> Result<(), QueryError> {
        let output = self.capture(
            &self.rpm,
            vec!["-qa".to_string(), "--qf".to_string(), QUERY_FORMAT.to_string()],
        )?;
        let installed = parse_query_output(&output)?;
        log::debug!("已安装 {} 个包", installed.len());
        self.installed = Some(installed);
        Ok(())
    }

    fn setup_repos(&mut self) -> Result<(), QueryError> {
        let mut args = vec![
            "-d".to_string(),
            self.options.debug_level.to_string(),
            "-e".to_string(),
            self.options.error_level.to_string(),
        ];
        args.extend(self.repo_args.iter().cloned());
        args.push("makecache".to_string());
        self.capture(&self.yum, args)?;
        Ok(())
    }

    fn setup_sack(&mut self) -> Result<(), QueryError> {
        let output = self.capture(
            &self.repoquery,
            self.repoquery_args(&["-a", "--show-duplicates"]),
        )?;
        self.sack = Some(parse_query_output(&output)?);
        Ok(())
    }

    fn lock(&mut self) -> Result<(), LockFailure> {
        if self.lock.is_none() {
            self.lock = Some(PidLock::try_acquire(&self.lock_path)?);
        }
        Ok(())
    }

    fn unlock(&mut self) {
        self.lock = None;
    }

    fn close_rpmdb(&mut self) {
        self.installed = None;
        self.sack = None;
    }

    fn packages(&mut self, narrow: Narrow) -> Result<Packages, QueryError> {
        let installed = self
            .installed
            .as_ref()
            .ok_or_else(|| QueryError::Attribute("package database is not open".to_string()))?;
        match self.generation {
            Generation::Modern => self.modern_packages(narrow),
            Generation::Legacy => self.legacy_packages(installed, narrow),
        }
    }

    fn allows_multiple_installs(&self, package: &PackageRecord) -> bool {
        self.install_only.iter().any(|n| *n == package.name)
    }
}

/// 每个已安装的 `name.arch`，取仓库中比已安装版本更新的最新版本
pub fn updates_from_sack(
    installed: &[PackageRecord],
    sack: &[PackageRecord],
) -> Vec<PackageRecord> {
    // 同一个包可能装了多个版本（内核），以最新的为准
    let mut newest_installed = HashMap::new();
    for p in installed {
        let evr = p.evr();
        newest_installed
            .entry(p.id())
            .and_modify(|e| {
                if evr > *e {
                    *e = evr.clone();
                }
            })
            .or_insert_with(|| evr.clone());
    }

    let mut updates: BTreeMap<String, PackageRecord> = BTreeMap::new();
    for candidate in sack {
        let id = candidate.id();
        let Some(current) = newest_installed.get(&id) else {
            continue;
        };
        if candidate.evr() <= *current {
            continue;
        }
        let newer = updates
            .get(&id)
            .map_or(true, |best| candidate.evr() > best.evr());
        if newer {
            updates.insert(id, candidate.clone());
        }
    }
    updates.into_values().collect()
}

/// 已安装 ∪ 仓库；不显示重复版本时每个 `name.arch` 只保留最新版本
pub fn all_packages(
    installed: &[PackageRecord],
    sack: &[PackageRecord],
    show_duplicates: bool,
) -> Vec<PackageRecord> {
    let mut all: Vec<PackageRecord> = Vec::new();
    for p in installed.iter().chain(sack.iter()) {
        if !all.iter().any(|q| q == p) {
            all.push(p.clone());
        }
    }
    all.sort_by(|a, b| a.id().cmp(&b.id()).then_with(|| a.evr().cmp(&b.evr())));

    if show_duplicates {
        return all;
    }
    let mut newest: BTreeMap<String, PackageRecord> = BTreeMap::new();
    for p in all {
        // 已按版本升序，后面的覆盖前面的
        newest.insert(p.id(), p);
    }
    newest.into_values().collect()
}
