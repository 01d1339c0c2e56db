//! 错误类型：每种失败对应协议中 `_err` 行的一个类型标记

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// 查询过程中的 I/O 或外部命令失败
    #[error("[Errno {errno}] {message}")]
    Io { errno: i32, message: String },

    /// 查询接口缺失或版本不兼容
    #[error("{0}")]
    Attribute(String),

    /// 非竞争原因导致的加锁失败
    #[error("[Errno {errno}] {message}")]
    Lock { errno: i32, message: String },

    /// 重试次数用尽仍未拿到锁
    #[error("could not acquire package database lock after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("{0}")]
    Config(String),

    /// 包管理器输出无法解析
    #[error("{0}")]
    Parse(String),

    /// `yum check-update` 返回了 0 和 100 之外的退出码
    #[error("check-update exited with status {status}")]
    Tool { status: i32 },
}

impl QueryError {
    /// `_err` 行的第二个字段
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Io { .. } => "IOError",
            QueryError::Attribute(_) => "AttributeError",
            QueryError::Lock { .. } => "LockError",
            QueryError::Timeout { .. } => "Timeout",
            QueryError::Config(_) => "ConfigError",
            QueryError::Parse(_) => "ParseError",
            QueryError::Tool { .. } => "ToolError",
        }
    }

    /// `_err` 行中类型标记之后的自由文本
    pub fn detail(&self) -> String {
        match self {
            QueryError::Io { errno, message } | QueryError::Lock { errno, message } => {
                format!("{} {}", errno, message)
            }
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            QueryError::Tool { status } => *status,
            _ => 1,
        }
    }

    /// 外部命令的退出码是否需要原样传递，此时不输出 `_err` 行
    pub fn is_propagated_status(&self) -> bool {
        matches!(self, QueryError::Tool { .. })
    }
}

impl From<std::io::Error> for QueryError {
    fn from(e: std::io::Error) -> Self {
        QueryError::Io {
            errno: e.raw_os_error().unwrap_or(0),
            message: e.to_string(),
        }
    }
}

/// 单次加锁尝试的失败原因
///
/// `errno == 0` 表示锁被其他进程持有（可以重试），其余为系统错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFailure {
    pub errno: i32,
    pub message: String,
}

impl LockFailure {
    pub fn held_by(pid: i32) -> Self {
        Self {
            errno: 0,
            message: format!("lock held by process {}", pid),
        }
    }

    pub fn is_contention(&self) -> bool {
        self.errno == 0
    }
}

impl From<std::io::Error> for LockFailure {
    fn from(e: std::io::Error) -> Self {
        Self {
            errno: e.raw_os_error().unwrap_or(libc::EIO),
            message: e.to_string(),
        }
    }
}

impl From<LockFailure> for QueryError {
    fn from(f: LockFailure) -> Self {
        QueryError::Lock {
            errno: f.errno,
            message: f.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn io_error_detail_carries_errno() {
        let e = QueryError::from(std::io::Error::from_raw_os_error(libc::ENOENT));
        assert_eq!(e.kind(), "IOError");
        assert!(e.detail().starts_with("2 "));
        assert_eq!(e.exit_code(), 1);
    }

    #[test]
    fn tool_status_is_propagated() {
        let e = QueryError::Tool { status: 3 };
        assert_eq!(e.exit_code(), 3);
        assert!(e.is_propagated_status());
    }

    #[test]
    fn contention_has_no_errno() {
        assert!(LockFailure::held_by(42).is_contention());
        let f = LockFailure::from(std::io::Error::from_raw_os_error(libc::EACCES));
        assert!(!f.is_contention());
        assert_eq!(QueryError::from(f).kind(), "LockError");
    }
}
