mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gate")]
#[command(about = "LLM ゲートウェイの構成を、宣言どおりに。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は gate.kdl を自動検索）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ゲートウェイの URL（gateway ノードや LITELLM_API_BASE より優先）
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// 管理者キー（LITELLM_API_KEY より優先）
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// ログを詳細に出力 (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定を検証（ゲートウェイには接続しない）
    Validate,
    /// 変更内容を表示
    Plan,
    /// 宣言をゲートウェイに反映
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 管理している全リソースを削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// ゲートウェイから state を読み直す
    Refresh,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("gateflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let flags = gateflow_config::ConnectionSettings {
        api_base: cli.api_base.clone(),
        api_key: cli.api_key.clone(),
        timeout_secs: None,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Validate => commands::validate::handle(config)?,
        Commands::Plan => commands::plan::handle(config, flags).await?,
        Commands::Apply { yes } => commands::apply::handle(config, flags, yes).await?,
        Commands::Destroy { yes } => commands::destroy::handle(config, flags, yes).await?,
        Commands::Refresh => commands::refresh::handle(config, flags).await?,
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
