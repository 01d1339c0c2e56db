//! 为包管理 provider 列出 RPM 系统上的待更新包
//!
//! 输出为逐行文本协议：每个包一行 `_pkg ...`，失败时一行 `_err <Kind> ...`。

pub mod config;
pub mod error;
pub mod package_manager;
pub mod protocol;
pub mod query;
pub mod runner;

pub use config::Config;
pub use error::QueryError;
