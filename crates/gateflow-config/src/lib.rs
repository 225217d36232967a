pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "GATE_CONFIG_PATH";
/// ゲートウェイの URL
pub const API_BASE_ENV: &str = "LITELLM_API_BASE";
/// マスターキーまたは管理者キー
pub const API_KEY_ENV: &str = "LITELLM_API_KEY";

/// プロジェクト内の作業ディレクトリ名
pub const PROJECT_DIR: &str = ".gateflow";

/// GateFlowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("gateflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのgate.kdlファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 GATE_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: gate.local.kdl, .gate.local.kdl, gate.kdl, .gate.kdl
/// 3. ./.gateflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/gateflow/gate.kdl (グローバル設定)
pub fn find_gate_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["gate.local.kdl", ".gate.local.kdl", "gate.kdl", ".gate.kdl"];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.gateflow/ ディレクトリで検索
    let gate_dir = current_dir.join(PROJECT_DIR);
    if gate_dir.is_dir() {
        for filename in &candidates {
            let path = gate_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/gateflow/gate.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("gateflow").join("gate.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::GateFileNotFound)
}

/// 設定ファイルに対応するプロジェクトルート
///
/// state ファイルは `<root>/.gateflow/` に置かれます。
/// `.gateflow/gate.kdl` の場合はその親ディレクトリがルートです。
pub fn project_root(gate_file: &Path) -> PathBuf {
    let parent = gate_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    match parent.file_name() {
        Some(name) if name == PROJECT_DIR => parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| parent.to_path_buf()),
        _ => parent.to_path_buf(),
    }
}

/// ゲートウェイへの接続設定
///
/// CLI フラグ、設定ファイルの gateway ノード、環境変数の順に
/// [`ConnectionSettings::or`] で重ねて使います。
#[derive(Clone, Default, PartialEq)]
pub struct ConnectionSettings {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ConnectionSettings {
    /// 環境変数から読み込む（空文字は未設定扱い）
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_base: var(API_BASE_ENV),
            api_key: var(API_KEY_ENV),
            timeout_secs: None,
        }
    }

    /// 未設定の項目を `fallback` で補う
    pub fn or(self, fallback: ConnectionSettings) -> Self {
        Self {
            api_base: self.api_base.or(fallback.api_base),
            api_key: self.api_key.or(fallback.api_key),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
        }
    }

    pub fn api_base(&self) -> Result<&str> {
        self.api_base.as_deref().ok_or(ConfigError::MissingSetting {
            name: "api_base",
            flag: "--api-base",
            env: API_BASE_ENV,
        })
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(ConfigError::MissingSetting {
            name: "api_key",
            flag: "--api-key",
            env: API_KEY_ENV,
        })
    }
}
