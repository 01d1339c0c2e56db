//! 两个命令共用的流程：选择查询方式、写出结果、把失败映射为退出码

use crate::config::Config;
use crate::error::QueryError;
use crate::package_manager::{fallback, RepoQuerySession};
use crate::protocol::{Layout, ProtocolWriter};
use crate::query::{list_matching, list_updates, LockPolicy};
use std::io::Write;

/// 配置中关闭加锁时返回 None
pub fn lock_policy(config: &Config) -> Option<LockPolicy> {
    config.use_lock.then(|| LockPolicy {
        attempts: config.lock_attempts,
        delay: config.lock_delay(),
    })
}

/// 列出可更新的包，返回进程退出码
pub fn updates<W: Write>(config: &Config, out: W) -> i32 {
    let mut writer = ProtocolWriter::new(out, Layout::Update);
    let repos = config.repo_options();

    if RepoQuerySession::available(config) {
        let lock = lock_policy(config);
        let result = RepoQuerySession::open(config, repos)
            .and_then(|session| list_updates(session, lock.as_ref(), &mut writer));
        finish(&mut writer, result, false)
    } else {
        log::info!("{} 不可用，回退到 {} check-update", config.repoquery, config.yum);
        let result = fallback::check_updates(&config.yum, &repos).and_then(|records| {
            for r in &records {
                writer.package(r)?;
            }
            Ok(records.len())
        });
        // 回退路径只输出错误类型
        finish(&mut writer, result, true)
    }
}

/// 列出名称为 `name` 的所有包，返回进程退出码
pub fn packages<W: Write>(config: &Config, name: &str, out: W) -> i32 {
    let mut writer = ProtocolWriter::new(out, Layout::InstallOnly);

    let result = if RepoQuerySession::available(config) {
        let lock = lock_policy(config);
        RepoQuerySession::open(config, config.repo_options())
            .and_then(|session| list_matching(session, name, lock.as_ref(), &mut writer))
    } else {
        Err(QueryError::Attribute(format!(
            "{} is not available",
            config.repoquery
        )))
    };
    finish(&mut writer, result, false)
}

/// 配置文件无法加载
pub fn config_error<W: Write>(out: W, layout: Layout, err: &anyhow::Error) -> i32 {
    let mut writer = ProtocolWriter::new(out, layout);
    finish(&mut writer, Err(QueryError::Config(format!("{:#}", err))), false)
}

fn finish<W: Write>(
    writer: &mut ProtocolWriter<W>,
    result: Result<usize, QueryError>,
    bare: bool,
) -> i32 {
    let code = match result {
        Ok(n) => {
            log::debug!("共输出 {} 个包", n);
            0
        }
        Err(e) if e.is_propagated_status() => e.exit_code(),
        Err(e) => {
            log::error!("{}: {}", e.kind(), e);
            let written = if bare {
                writer.bare_error(&e)
            } else {
                writer.error(&e)
            };
            if let Err(w) = written {
                log::error!("写出错误行失败: {}", w);
            }
            e.exit_code()
        }
    };

    match writer.flush() {
        Ok(()) => code,
        Err(e) => {
            log::error!("刷新输出失败: {}", e);
            if code == 0 {
                1
            } else {
                code
            }
        }
    }
}
