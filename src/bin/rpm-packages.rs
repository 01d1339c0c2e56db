use clap::error::ErrorKind;
use clap::Parser;
use rpm_updates::config::Config;
use rpm_updates::protocol::Layout;
use rpm_updates::runner;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: rpm-packages <name>";

/// 列出名称匹配的所有包：`_pkg <name> <version> <release> <arch> <multi>`
#[derive(Debug, Parser)]
#[command(name = "rpm-packages", version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    /// 包名（精确匹配）
    name: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            log::debug!("{}", e);
            // 调用方从 stdout 读取用法提示
            println!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    let stdout = std::io::stdout();
    let out = stdout.lock();

    let code = match Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => runner::packages(&config, &cli.name, out),
        Err(e) => runner::config_error(out, Layout::InstallOnly, &e),
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
