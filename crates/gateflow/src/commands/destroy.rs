use crate::utils;
use colored::Colorize;
use gateflow_cloud::{GatewayProvider, ResourceSet, StateManager};
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
    let lock = manager.acquire_lock("destroy").await?;
    let mut state = manager.load().await?;

    if state.resources.is_empty() {
        println!("{}", "管理中のリソースはありません".green());
        lock.release().await?;
        return Ok(());
    }

    let plan = provider.plan(&ResourceSet::new(), &state).await?;
    utils::print_plan(&plan);

    if !yes {
        println!();
        println!(
            "{}",
            "警告: state で管理している全リソースをゲートウェイから削除します".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "削除中...".blue().bold());
    let result = provider.destroy_all(&mut state).await?;
    manager.save(&state).await?;
    lock.release().await?;

    utils::print_apply_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} 件のリソースの削除に失敗しました", result.failed.len());
    }

    println!("{}", "✓ 全リソースを削除しました".green().bold());
    Ok(())
}
