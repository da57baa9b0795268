use clap::Parser;
use colored::Colorize;

use qrlinker::cli::{Cli, Commands};
use qrlinker::config::{get_config, init_config};
use qrlinker::runtime::modes;
use qrlinker::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config(cli.config.as_deref());

    // guard 需要存活到进程结束，否则文件日志会丢失
    let _log_guard = init_logging(&get_config().logging)?;

    let result = match cli.command {
        None | Some(Commands::Serve) => modes::run_server().await,
        Some(command) => modes::run_cli(command).await,
    };

    if let Err(e) = &result {
        eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
    }
    result
}
