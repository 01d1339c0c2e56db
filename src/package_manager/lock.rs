//! 包数据库的 pid 锁（与 yum 共用 /var/run/yum.pid）
//!
//! 锁文件里只有持有者的 pid。文件存在且该进程仍然存活即视为被占用；
//! 空文件说明其他程序正在写入，同样视为被占用。持有者已经退出的
//! 残留锁文件会被删除后重新尝试。

use crate::error::LockFailure;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 已持有的锁，drop 时删除锁文件
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// 尝试获取一次锁，不做等待
    ///
    /// pid 先写进临时文件，再硬链接为锁文件，所以锁文件一出现就带着 pid。
    pub fn try_acquire(path: &Path) -> Result<Self, LockFailure> {
        let own = std::process::id() as i32;
        let staging = staging_path(path, own);
        fs::write(&staging, format!("{}\n", own))?;

        let result = Self::link(&staging, path, own);
        if let Err(e) = fs::remove_file(&staging) {
            log::warn!("删除临时锁文件 {} 失败: {}", staging.display(), e);
        }
        result
    }

    fn link(staging: &Path, path: &Path, own: i32) -> Result<Self, LockFailure> {
        // 最多清理一次残留锁文件
        for _ in 0..2 {
            match fs::hard_link(staging, path) {
                Ok(()) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => match read_owner(path)? {
                    Owner::Pid(pid) if pid == own => {
                        return Err(LockFailure {
                            errno: libc::EDEADLK,
                            message: format!("lock {} already held by this process", path.display()),
                        })
                    }
                    Owner::Pid(pid) if process_alive(pid) => return Err(LockFailure::held_by(pid)),
                    // 其他程序刚创建、还没写入 pid
                    Owner::Empty => return Err(LockFailure::held_by(0)),
                    _ => {
                        log::warn!("删除残留锁文件 {}", path.display());
                        if let Err(e) = fs::remove_file(path) {
                            if e.kind() != ErrorKind::NotFound {
                                return Err(e.into());
                            }
                        }
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }

        // 清理之后仍然抢不到，视为竞争
        match read_owner(path)? {
            Owner::Pid(pid) => Err(LockFailure::held_by(pid)),
            _ => Err(LockFailure::held_by(0)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("释放锁 {} 失败: {}", self.path.display(), e);
        }
    }
}

/// 锁文件的内容
#[derive(Debug, PartialEq, Eq)]
enum Owner {
    Pid(i32),
    Empty,
    /// 无法解析或文件已消失，按残留处理
    Stale,
}

fn read_owner(path: &Path) -> Result<Owner, LockFailure> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Owner::Empty),
        Ok(content) => Ok(match content.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Owner::Pid(pid),
            _ => Owner::Stale,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Owner::Stale),
        Err(e) => Err(e.into()),
    }
}

/// 与锁文件同目录的临时文件，硬链接不能跨文件系统
fn staging_path(path: &Path, pid: i32) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}", pid));
    path.with_file_name(name)
}

/// kill(pid, 0)：进程存在（包括无权限发信号的情况）即视为存活
fn process_alive(pid: i32) -> bool {
    let ret = unsafe { libc::kill(pid, 0) };
    if ret == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
