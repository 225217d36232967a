use crate::utils;
use colored::Colorize;
use gateflow_cloud::{GatewayProvider, StateManager};
use gateflow_config::ConnectionSettings;
use std::path::Path;

pub async fn handle(config: Option<&Path>, flags: ConnectionSettings) -> anyhow::Result<()> {
    let project = utils::load_project(config)?;
    utils::print_loaded_config_file(&project);

    let provider = utils::connect(flags, &project.declarations.gateway)?;
    let state = StateManager::new(&project.root).load().await?;

    println!("{}", "ゲートウェイと比較中...".blue());
    let plan = provider
        .plan(&project.declarations.resources, &state)
        .await?;
    utils::print_plan(&plan);

    Ok(())
}
