use crate::utils;
use colored::Colorize;
use gateflow_cloud::{GatewayProvider, StateManager};
use gateflow_config::ConnectionSettings;
use std::path::Path;

pub async fn handle(config: Option<&Path>, flags: ConnectionSettings) -> anyhow::Result<()> {
    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let provider = utils::connect(flags, &project.declarations.gateway)?;
    let manager = StateManager::new(&project.root);
    let lock = manager.acquire_lock("refresh").await?;
    let mut state = manager.load().await?;

    println!("{}", "ゲートウェイから読み込み中...".blue());
    let result = provider.refresh(&mut state).await?;
    manager.save(&state).await?;
    lock.release().await?;

    for address in &result.refreshed {
        println!("  {} {}", "✓".green(), address);
    }
    for address in &result.removed {
        println!(
            "  {} {} (ゲートウェイに存在しないため state から削除)",
            "-".red(),
            address.yellow()
        );
    }
    println!();
    println!(
        "更新: {}, 削除: {}",
        result.refreshed.len(),
        result.removed.len()
    );

    Ok(())
}
