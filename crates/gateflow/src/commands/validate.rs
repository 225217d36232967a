use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let project = match utils::load_project(config) {
        Ok(project) => project,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {:#}", e);
            std::process::exit(1);
        }
    };

    utils::print_loaded_config_file(&project);
    println!("{}", "✓ 設定ファイルは正常です！".green().bold());

    let decl = &project.declarations;
    let set = &decl.resources;
    println!();
    println!("サマリー:");
    if let Some(api_base) = &decl.gateway.api_base {
        println!("  ゲートウェイ: {}", api_base.cyan());
    }

    println!("  モデル: {}個", set.models.len());
    for (name, model) in &set.models {
        println!(
            "    - {} ({}/{})",
            name.cyan(),
            model.custom_llm_provider,
            model.base_model
        );
    }

    println!("  チーム: {}個", set.teams.len());
    for (name, team) in &set.teams {
        let budget = team
            .max_budget
            .map(|b| format!(", 予算 {b}"))
            .unwrap_or_default();
        println!("    - {} ({}{})", name.cyan(), team.team_alias, budget);
    }

    if !set.member_sets.is_empty() {
        println!("  チームメンバー: {}個", set.member_sets.len());
        for (name, spec) in &set.member_sets {
            println!(
                "    - {} ({} → {}名)",
                name.cyan(),
                spec.team,
                spec.members.len()
            );
        }
    }

    if !set.keys.is_empty() {
        println!("  APIキー: {}個", set.keys.len());
        for (name, key) in &set.keys {
            let team = key
                .team
                .as_ref()
                .map(|t| format!(" → {t}"))
                .unwrap_or_default();
            println!("    - {}{}", name.cyan(), team);
        }
    }

    Ok(())
}
