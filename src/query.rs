//! 查询执行：初始化会话、（可选）加锁、取包列表并写出协议行

use crate::error::QueryError;
use crate::package_manager::{Generation, Narrow, Session, SessionOptions};
use crate::protocol::ProtocolWriter;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// 加锁的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

/// 持有会话直到 drop：关闭数据库，然后释放锁（如果拿到了）
pub struct OpenSession<S: Session> {
    inner: S,
    locked: bool,
}

impl<S: Session> OpenSession<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            locked: false,
        }
    }

    /// 按策略获取锁：被占用时等待后重试，其他错误立即返回
    pub fn acquire_lock(&mut self, policy: &LockPolicy) -> Result<(), QueryError> {
        // 至少尝试一次
        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.inner.lock() {
                Ok(()) => {
                    self.locked = true;
                    return Ok(());
                }
                Err(f) if f.is_contention() => {
                    log::debug!("包数据库被占用（第 {} 次）: {}", attempt, f.message);
                    if attempt < attempts {
                        std::thread::sleep(policy.delay);
                    }
                }
                Err(f) => return Err(f.into()),
            }
        }
        Err(QueryError::Timeout { attempts })
    }
}

impl<S: Session> Deref for OpenSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: Session> DerefMut for OpenSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Session> Drop for OpenSession<S> {
    fn drop(&mut self) {
        self.inner.close_rpmdb();
        if self.locked {
            self.inner.unlock();
        }
    }
}

/// 初始化会话：覆盖选项，按代际走对应的初始化流程，最后加锁
fn prepare<S: Session>(
    session: S,
    options: &SessionOptions,
    lock: Option<&LockPolicy>,
) -> Result<OpenSession<S>, QueryError> {
    let mut session = OpenSession::new(session);
    session.apply_overrides(options);
    session.setup_config()?;
    session.setup_transaction()?;
    session.setup_rpmdb()?;

    match session.generation() {
        Generation::Modern => {}
        Generation::Legacy => {
            // 旧版本不会隐式初始化仓库和包索引
            session.setup_repos()?;
            session.setup_sack()?;
        }
    }

    if let Some(policy) = lock {
        session.acquire_lock(policy)?;
    }
    Ok(session)
}

/// 列出所有可更新的包，返回写出的行数
pub fn list_updates<S: Session, W: Write>(
    session: S,
    lock: Option<&LockPolicy>,
    out: &mut ProtocolWriter<W>,
) -> Result<usize, QueryError> {
    let mut session = prepare(session, &SessionOptions::updates(), lock)?;
    let mut count = 0;
    for record in session.packages(Narrow::Updates)? {
        out.package(&record?)?;
        count += 1;
    }
    Ok(count)
}

/// 列出名称完全等于 `name` 的所有包，并标注是否允许多版本共存
pub fn list_matching<S: Session, W: Write>(
    session: S,
    name: &str,
    lock: Option<&LockPolicy>,
    out: &mut ProtocolWriter<W>,
) -> Result<usize, QueryError> {
    let mut session = prepare(session, &SessionOptions::all_packages(), lock)?;
    let mut count = 0;
    for record in session.packages(Narrow::All)? {
        let mut record = record?;
        if record.name != name {
            continue;
        }
        record.multi_install = Some(session.allows_multiple_installs(&record));
        out.package(&record)?;
        count += 1;
    }
    Ok(count)
}
