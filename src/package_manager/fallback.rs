//! 命令行回退：查询接口不可用时解析 `yum check-update` 的输出

use super::parser::parse_check_update;
use super::types::{CommandOutput, PackageRecord};
use super::RepoOptions;
use crate::error::QueryError;

/// 有可用更新时 `yum check-update` 的退出码
pub const UPDATES_AVAILABLE: i32 = 100;

/// 执行 `yum check-update`，合并 stdout/stderr
pub fn check_updates(yum: &str, repos: &RepoOptions) -> Result<Vec<PackageRecord>, QueryError> {
    let mut args = vec!["check-update".to_string()];
    args.extend(repos.to_args());
    log::debug!("执行: {} {}", yum, args.join(" "));

    let output: CommandOutput = duct::cmd(yum, args)
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .run()?
        .into();
    interpret(yum, &output)
}

/// 退出码 0：没有更新；100：解析输出；其他：原样传递给调用方
pub fn interpret(yum: &str, output: &CommandOutput) -> Result<Vec<PackageRecord>, QueryError> {
    match output.status {
        Some(0) => {
            log::debug!("{} check-update 返回 0，没有可用更新", yum);
            Ok(Vec::new())
        }
        Some(UPDATES_AVAILABLE) => parse_check_update(&output.output),
        Some(status) => {
            log::warn!("{} check-update 退出码 {}", yum, status);
            Err(QueryError::Tool { status })
        }
        None => {
            log::warn!("{} check-update 被信号终止", yum);
            Err(QueryError::Tool { status: 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(status: Option<i32>, text: &str) -> CommandOutput {
        CommandOutput {
            output: text.to_string(),
            status,
        }
    }

    const UPDATES: &str = "Loaded plugins: fastestmirror\n\nfoo.x86_64  2:1.2.3-4.el5  updates\n";

    #[test]
    fn status_zero_means_no_updates() {
        // 退出码 0 时不解析输出
        assert!(interpret("yum", &output(Some(0), UPDATES)).unwrap().is_empty());
    }

    #[test]
    fn status_100_parses_output() {
        assert_eq!(
            interpret("yum", &output(Some(100), UPDATES)).unwrap(),
            vec![PackageRecord::new("foo", "2", "1.2.3", "4.el5", "x86_64")]
        );
    }

    #[test]
    fn other_status_is_propagated() {
        let err = interpret("yum", &output(Some(1), "Error: cannot retrieve repository metadata"))
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.is_propagated_status());

        let err = interpret("yum", &output(Some(7), "")).unwrap_err();
        assert_eq!(err.exit_code(), 7);

        let err = interpret("yum", &output(None, "")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn parse_failure_is_reported() {
        let err = interpret("yum", &output(Some(100), "\n.x86_64 1.0-1 base\n")).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }
}
