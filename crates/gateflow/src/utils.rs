use colored::Colorize;
use gateflow_cloud::{ActionType, ApplyResult, Plan};
use gateflow_cloud_litellm::{LiteLlmConfig, LiteLlmProvider};
use gateflow_config::ConnectionSettings;
use gateflow_core::{Declarations, GatewaySettings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 読み込んだプロジェクト
pub struct Project {
    pub gate_file: PathBuf,
    /// state ファイル (.gateflow/) を置くディレクトリ
    pub root: PathBuf,
    pub declarations: Declarations,
}

/// 設定ファイルを探してロードする
pub fn load_project(config: Option<&Path>) -> anyhow::Result<Project> {
    let gate_file = match config {
        Some(path) => path.to_path_buf(),
        None => gateflow_config::find_gate_file()?,
    };
    let declarations = gateflow_core::load_declarations(&gate_file)?;
    let root = gateflow_config::project_root(&gate_file);

    Ok(Project {
        gate_file,
        root,
        declarations,
    })
}

/// 接続設定を解決してプロバイダーを作る
///
/// 優先順位: CLI フラグ → gateway ノード → 環境変数
pub fn connect(
    flags: ConnectionSettings,
    gateway: &GatewaySettings,
) -> anyhow::Result<LiteLlmProvider> {
    let file = ConnectionSettings {
        api_base: gateway.api_base.clone(),
        api_key: None,
        timeout_secs: gateway.timeout_secs,
    };
    let settings = flags.or(file).or(ConnectionSettings::from_env());

    let mut config = LiteLlmConfig::new(settings.api_base()?, settings.api_key()?);
    if let Some(secs) = settings.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    tracing::debug!(api_base = %config.api_base, "connecting to gateway");

    Ok(LiteLlmProvider::from_config(config)?)
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_file(project: &Project) {
    println!(
        "📄 設定ファイル: {}",
        project.gate_file.display().to_string().cyan()
    );
}

/// 実行計画を表示
pub fn print_plan(plan: &Plan) {
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません。宣言とゲートウェイは一致しています".green());
        return;
    }

    println!();
    println!("{}", "実行計画:".bold());
    for action in &plan.actions {
        let symbol = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => continue,
        };
        println!("  {} {}", symbol, action.description);
        for change in &action.changes {
            println!("      {}", change.dimmed());
        }
    }
    println!();
    println!("計画: {}", plan.summary().to_string().bold());
}

/// 適用結果を表示
pub fn print_apply_result(result: &ApplyResult) {
    println!();
    for ok in &result.succeeded {
        println!("  {} {}", "✓".green(), ok.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.address.cyan(),
            failed.error.as_deref().unwrap_or("不明なエラー")
        );
    }
    println!();
    println!(
        "成功: {}, 失敗: {} ({} ms)",
        result.succeeded.len().to_string().green(),
        result.failed.len().to_string().red(),
        result.duration_ms
    );
}
