use clap::Parser;
use rpm_updates::config::Config;
use rpm_updates::protocol::Layout;
use rpm_updates::runner;
use std::path::PathBuf;
use std::process::ExitCode;

/// 列出待更新的包：`_pkg <name> <epoch> <version> <release> <arch>`
#[derive(Debug, Parser)]
#[command(name = "rpm-updates", version, about)]
struct Cli {
    /// 配置文件（默认 $RPM_UPDATES_CONFIG 或 /etc/rpm-updates/config.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_name = "REPO")]
    enablerepo: Vec<String>,

    #[arg(long, value_name = "REPO")]
    disablerepo: Vec<String>,

    #[arg(long, value_name = "REPO")]
    disableexcludes: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let stdout = std::io::stdout();
    let out = stdout.lock();

    let code = match Config::load_or_default(cli.config.as_deref()) {
        Ok(mut config) => {
            // 命令行的仓库参数追加在配置文件之后
            config.enablerepo.extend(cli.enablerepo);
            config.disablerepo.extend(cli.disablerepo);
            config.disableexcludes.extend(cli.disableexcludes);
            runner::updates(&config, out)
        }
        Err(e) => runner::config_error(out, Layout::Update, &e),
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
