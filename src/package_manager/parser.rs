//! 输出解析函数

use super::evr::Evr;
use super::types::PackageRecord;
use crate::error::QueryError;

/// `yum check-update` 表头下的分隔线
pub const SEPARATOR: &str =
    "--------------------------------------------------------------------------------";

/// `rpm -qa` / `repoquery` 使用的查询格式，每个包一行
pub const QUERY_FORMAT: &str = "%{name} %{epoch} %{version} %{release} %{arch}\n";

/// yum 内置的可多版本安装包列表（yum.conf 未配置 installonlypkgs 时使用）
pub const DEFAULT_INSTALL_ONLY: &[&str] = &[
    "kernel",
    "kernel-bigmem",
    "kernel-enterprise",
    "kernel-smp",
    "kernel-modules",
    "kernel-debug",
    "kernel-unsupported",
    "kernel-source",
    "kernel-devel",
    "kernel-PAE",
    "kernel-PAE-debug",
];

/// 拆分 `name.arch`，架构为最后一个 '.' 之后的部分
pub fn split_name_arch(s: &str) -> Result<(&str, &str), QueryError> {
    match s.rsplit_once('.') {
        Some((name, arch)) if !name.is_empty() && !arch.is_empty() => Ok((name, arch)),
        _ => Err(QueryError::Parse(format!(
            "failed to parse package name and architecture from '{}'",
            s
        ))),
    }
}

fn parse_update_fields(name_arch: &str, evr: &str) -> Result<PackageRecord, QueryError> {
    let (name, arch) = split_name_arch(name_arch)?;
    let evr = Evr::parse(evr)
        .ok_or_else(|| QueryError::Parse(format!("invalid version string '{}'", evr)))?;
    Ok(PackageRecord::new(
        name,
        &evr.epoch,
        &evr.version,
        &evr.release,
        arch,
    ))
}

/// 更新列表之后的段落（被替代包、安全公告等）以这些前缀开头
const BODY_END: &[&str] = &["Obsoleting", "Security:", "Update"];

/// 解析 `yum check-update` 的输出
///
/// 分隔符（80 个 '-' 或空行）之前的内容全部跳过。每个包一行：
///   `foo.x86_64    2:1.2.3-4.el5    updates`
/// 列过宽时 yum 会把名称之后的任意一列折到下一行，所以按空行分段，
/// 段内所有字段每三个一组。
pub fn parse_check_update(output: &str) -> Result<Vec<PackageRecord>, QueryError> {
    let mut records = Vec::new();
    let mut found_separator = false;
    let mut chunk: Vec<&str> = Vec::new();

    for line in output.lines() {
        if !found_separator {
            if line.trim().is_empty() || line.trim_end() == SEPARATOR {
                found_separator = true;
            }
            continue;
        }
        if BODY_END.iter().any(|p| line.starts_with(p)) {
            break;
        }
        if line.trim().is_empty() {
            collect_updates(&chunk, &mut records)?;
            chunk.clear();
            continue;
        }
        chunk.extend(line.split_whitespace());
    }
    collect_updates(&chunk, &mut records)?;

    Ok(records)
}

fn collect_updates(fields: &[&str], records: &mut Vec<PackageRecord>) -> Result<(), QueryError> {
    for tuple in fields.chunks(3) {
        // 不是 `name.arch evr` 形式的组（提示信息等）直接忽略
        if tuple.len() < 2 || !tuple[0].contains('.') || Evr::parse(tuple[1]).is_none() {
            log::debug!("忽略 check-update 输出: {}", tuple.join(" "));
            continue;
        }
        records.push(parse_update_fields(tuple[0], tuple[1])?);
    }
    Ok(())
}

/// 解析一行 QUERY_FORMAT 输出，rpm 对未设置的 epoch 输出 "(none)"
pub fn parse_query_line(line: &str) -> Result<PackageRecord, QueryError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(QueryError::Parse(format!("unexpected query output '{}'", line)));
    }
    let epoch = match fields[1] {
        "(none)" => "0",
        e => e,
    };
    Ok(PackageRecord::new(
        fields[0], epoch, fields[2], fields[3], fields[4],
    ))
}

/// 解析整段 QUERY_FORMAT 输出，跳过空行
pub fn parse_query_output(output: &str) -> Result<Vec<PackageRecord>, QueryError> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_query_line)
        .collect()
}

/// 从 yum.conf 的 `[main]` 段读取 installonlypkgs
///
/// 值可以用空格或逗号分隔，也可以缩进续行。返回 None 表示未配置。
pub fn parse_install_only(conf: &str) -> Option<Vec<String>> {
    let mut in_main = false;
    let mut value: Option<String> = None;
    let mut continuing = false;

    for line in conf.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_main = &trimmed[1..trimmed.len() - 1] == "main";
            continuing = false;
            continue;
        }
        if !in_main {
            continue;
        }
        if continuing && (line.starts_with(' ') || line.starts_with('\t')) && !trimmed.is_empty() {
            if let Some(v) = value.as_mut() {
                v.push(' ');
                v.push_str(trimmed);
            }
            continue;
        }
        continuing = false;
        if let Some((key, val)) = trimmed.split_once('=') {
            if key.trim() == "installonlypkgs" {
                value = Some(val.trim().to_string());
                continuing = true;
            }
        }
    }

    value.map(|v| {
        v.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    })
}
