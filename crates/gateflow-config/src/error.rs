use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: gate.kdl, gate.local.kdl, .gate.kdl, .gate.local.kdl\n\
        - ./.gateflow/ ディレクトリ\n\
        - ~/.config/gateflow/gate.kdl\n\
        または GATE_CONFIG_PATH 環境変数で直接指定できます"
    )]
    GateFileNotFound,

    #[error("接続設定 {name} がありません。{flag} フラグまたは環境変数 {env} で指定してください")]
    MissingSetting {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
