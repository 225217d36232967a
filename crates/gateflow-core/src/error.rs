use gateflow_cloud::CloudError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("{address} に {field} が指定されていません")]
    MissingField { address: String, field: String },

    #[error("{address} の {field} が不正です: {message}")]
    InvalidValue {
        address: String,
        field: String,
        message: String,
    },

    #[error("{address} に不明なフィールドがあります: {field}")]
    UnknownField { address: String, field: String },

    #[error("リソースが重複しています: {0}")]
    DuplicateResource(String),

    #[error("{address} が未定義のチームを参照しています: {team}")]
    UnknownTeam { address: String, team: String },

    #[error("環境変数が設定されていません: {var} ({address})")]
    MissingEnvVar { var: String, address: String },

    #[error("{address} の設定が無効です: {source}")]
    InvalidResource {
        address: String,
        #[source]
        source: CloudError,
    },
}

pub type Result<T> = std::result::Result<T, FlowError>;
