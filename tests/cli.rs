use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// 用 `sh` 冒充 yum：`sh check-update` 会执行工作目录下名为 check-update 的脚本
fn fake_yum(output: &str, status: i32) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("check-update"),
        format!("cat <<'EOF'\n{}EOF\nexit {}\n", output, status),
    )
    .unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "yum = \"sh\"\nprefer_library = false\n",
    )
    .unwrap();
    dir
}

fn rpm_updates(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rpm-updates").unwrap();
    cmd.current_dir(dir)
        .arg("--config")
        .arg(dir.join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

const CHECK_UPDATE: &str = "Loaded plugins: fastestmirror
--------------------------------------------------------------------------------

foo.x86_64  2:1.2.3-4.el5  updates
bar.noarch  1.0-1.el5      base
";

#[test]
fn fallback_lists_updates() {
    let dir = fake_yum(CHECK_UPDATE, 100);
    rpm_updates(dir.path())
        .assert()
        .success()
        .stdout("_pkg foo 2 1.2.3 4.el5 x86_64\n_pkg bar 0 1.0 1.el5 noarch\n");
}

#[test]
fn fallback_without_updates_prints_nothing() {
    let dir = fake_yum(CHECK_UPDATE, 0);
    rpm_updates(dir.path()).assert().success().stdout("");
}

#[test]
fn fallback_propagates_tool_status() {
    let dir = fake_yum("Error: Cannot retrieve repository metadata\n", 1);
    rpm_updates(dir.path()).assert().code(1).stdout("");

    let dir = fake_yum("", 3);
    rpm_updates(dir.path()).assert().code(3).stdout("");
}

#[test]
fn fallback_parse_failure_reports_kind_only() {
    let dir = fake_yum("\n.x86_64 1.0-1 base\n", 100);
    rpm_updates(dir.path())
        .assert()
        .code(1)
        .stdout("_err ParseError\n");
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "use_lock = \"maybe\"\n").unwrap();
    rpm_updates(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("_err ConfigError "));
}

#[test]
fn packages_requires_exactly_one_name() {
    for args in [vec![], vec!["kernel", "bash"]] {
        Command::cargo_bin("rpm-packages")
            .unwrap()
            .args(&args)
            .assert()
            .code(1)
            .stdout("Usage: rpm-packages <name>\n");
    }
}

/// 在临时目录里放 yum / rpm / repoquery 脚本，配置指向这些脚本
///
/// repoquery 把每次调用的参数追加到 repoquery.args，按 `--pkgnarrow` 选择输出。
fn fake_tools(yum_version: &str, updates: &str, all: &str, repoquery_status: i32) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    script(
        root,
        "yum",
        &format!("if [ \"$1\" = --version ]; then echo {}; fi\n", yum_version),
    );
    script(
        root,
        "rpm",
        "printf 'kernel (none) 3.10.0 1127.el7 x86_64\\nbash (none) 4.2.46 34.el7 x86_64\\n'\n",
    );
    script(
        root,
        "repoquery",
        &format!(
            "echo \"$@\" >> \"$(dirname \"$0\")/repoquery.args\"\n\
             case \"$*\" in\n\
             *--pkgnarrow=updates*) printf '{}' ;;\n\
             *) printf '{}' ;;\n\
             esac\n\
             exit {}\n",
            updates, all, repoquery_status
        ),
    );
    fs::write(
        root.join("config.toml"),
        format!(
            "yum = '{0}/yum'\nrpm = '{0}/rpm'\nrepoquery = '{0}/repoquery'\n\
             yum_conf = '{0}/yum.conf'\nlock_path = '{0}/yum.pid'\nlock_delay_secs = 0\n",
            root.display()
        ),
    )
    .unwrap();
    dir
}

fn script(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn rpm_packages(dir: &Path, name: &str) -> Command {
    let mut cmd = Command::cargo_bin("rpm-packages").unwrap();
    cmd.arg("--config")
        .arg(dir.join("config.toml"))
        .arg(name)
        .env_remove("RUST_LOG");
    cmd
}

fn repoquery_calls(dir: &Path) -> String {
    fs::read_to_string(dir.join("repoquery.args")).unwrap_or_default()
}

const ALL_KERNELS: &str = "kernel (none) 3.10.0 1127.el7 x86_64\\n\
                           kernel 0 3.10.0 1160.el7 x86_64\\n\
                           kernel-devel 0 3.10.0 1160.el7 x86_64\\n";

#[test]
fn query_interface_lists_updates() {
    let dir = fake_tools("3.4.3", "bash (none) 4.2.46 35.el7_9 x86_64\\n", "", 0);
    rpm_updates(dir.path())
        .assert()
        .success()
        .stdout("_pkg bash 0 4.2.46 35.el7_9 x86_64\n");

    let calls = repoquery_calls(dir.path());
    assert!(calls.contains("--pkgnarrow=updates"));
    assert!(!calls.contains("--show-duplicates"));
    // 退出后锁文件已删除
    assert!(!dir.path().join("yum.pid").exists());
}

#[test]
fn query_interface_lists_every_version_with_multi_flag() {
    let dir = fake_tools("3.4.3", "", ALL_KERNELS, 0);
    rpm_packages(dir.path(), "kernel")
        .assert()
        .success()
        .stdout("_pkg kernel 3.10.0 1127.el7 x86_64 1\n_pkg kernel 3.10.0 1160.el7 x86_64 1\n");

    let calls = repoquery_calls(dir.path());
    assert!(calls.contains("--pkgnarrow=all"));
    assert!(calls.contains("--show-duplicates"));
    assert!(!dir.path().join("yum.pid").exists());
}

#[test]
fn install_only_list_from_yum_conf_sets_multi_flag() {
    let dir = fake_tools("3.4.3", "", ALL_KERNELS, 0);
    fs::write(dir.path().join("yum.conf"), "[main]\ninstallonlypkgs=kernel-devel\n").unwrap();
    rpm_packages(dir.path(), "kernel-devel")
        .assert()
        .success()
        .stdout("_pkg kernel-devel 3.10.0 1160.el7 x86_64 1\n");
    rpm_packages(dir.path(), "kernel")
        .assert()
        .success()
        .stdout(predicate::str::ends_with(" x86_64 0\n"));
}

#[test]
fn legacy_yum_compares_rpmdb_with_sack() {
    // 3.0 需要显式准备仓库和 sack，更新在本地按版本比较得出
    let dir = fake_tools("3.0.1", "", ALL_KERNELS, 0);
    rpm_updates(dir.path())
        .assert()
        .success()
        .stdout("_pkg kernel 0 3.10.0 1160.el7 x86_64\n");
    assert!(repoquery_calls(dir.path()).contains("--show-duplicates"));
}

#[test]
fn failing_repoquery_is_an_io_error() {
    let dir = fake_tools("3.4.3", "", "", 2);
    rpm_updates(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("_err IOError 0 "));
    rpm_packages(dir.path(), "kernel")
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("_err IOError 0 "));
    assert!(!dir.path().join("yum.pid").exists());
}

#[test]
fn held_lock_times_out() {
    let dir = fake_tools("3.4.3", "", "", 0);
    fs::write(dir.path().join("yum.pid"), "1\n").unwrap();
    let config = dir.path().join("config.toml");
    let mut text = fs::read_to_string(&config).unwrap();
    text.push_str("lock_attempts = 2\n");
    fs::write(&config, text).unwrap();

    rpm_updates(dir.path())
        .assert()
        .code(1)
        .stdout("_err Timeout could not acquire package database lock after 2 attempts\n");
    // 别人的锁保持原样
    assert_eq!(fs::read_to_string(dir.path().join("yum.pid")).unwrap(), "1\n");
    assert!(repoquery_calls(dir.path()).is_empty());
}
