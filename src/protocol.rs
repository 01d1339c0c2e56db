//! 调用方解析的行协议：`_pkg ...` 与 `_err <Kind> ...`

use crate::error::QueryError;
use crate::package_manager::PackageRecord;
use std::io::{self, Write};

/// `_pkg` 行的字段布局，同一次调用中保持不变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// name epoch version release arch
    Update,
    /// name version release arch multi
    InstallOnly,
}

pub struct ProtocolWriter<W: Write> {
    out: W,
    layout: Layout,
}

impl<W: Write> ProtocolWriter<W> {
    pub fn new(out: W, layout: Layout) -> Self {
        Self { out, layout }
    }

    pub fn package(&mut self, p: &PackageRecord) -> io::Result<()> {
        match self.layout {
            Layout::Update => writeln!(
                self.out,
                "_pkg {} {} {} {} {}",
                p.name, p.epoch, p.version, p.release, p.arch
            ),
            Layout::InstallOnly => writeln!(
                self.out,
                "_pkg {} {} {} {} {}",
                p.name,
                p.version,
                p.release,
                p.arch,
                if p.multi_install.unwrap_or(false) { 1 } else { 0 }
            ),
        }
    }

    pub fn error(&mut self, e: &QueryError) -> io::Result<()> {
        writeln!(self.out, "_err {} {}", e.kind(), e.detail())
    }

    /// 只输出错误类型，不带详情（命令行回退路径）
    pub fn bare_error(&mut self, e: &QueryError) -> io::Result<()> {
        writeln!(self.out, "_err {}", e.kind())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
