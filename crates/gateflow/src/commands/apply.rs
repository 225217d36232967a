use crate::utils;
use colored::Colorize;
use gateflow_cloud::{GatewayProvider, StateManager};
use gateflow_config::ConnectionSettings;
use std::path::Path;

pub async fn handle(
    config: Option<&Path>,
    flags: ConnectionSettings,
    yes: bool,
) -> anyhow::Result<()> {
    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let provider = utils::connect(flags, &project.declarations.gateway)?;
    let manager = StateManager::new(&project.root);
    let lock = manager.acquire_lock("apply").await?;
    let mut state = manager.load().await?;

    println!("{}", "ゲートウェイと比較中...".blue());
    let desired = &project.declarations.resources;
    let plan = provider.plan(desired, &state).await?;
    utils::print_plan(&plan);

    if !plan.has_changes {
        lock.release().await?;
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "適用中...".blue().bold());
    let result = provider.apply(&plan, desired, &mut state).await?;

    // 失敗があっても作成済みの ID は保存する
    manager.save(&state).await?;
    lock.release().await?;

    utils::print_apply_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} 件のリソースの適用に失敗しました", result.failed.len());
    }

    println!("{}", "✓ 適用が完了しました".green().bold());
    Ok(())
}
