use serde::{Deserialize, Serialize};

/// gateway ノードの接続設定
///
/// 未指定の項目は環境変数や CLI フラグから補われます。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// 例: `https://litellm.example.com`
    pub api_base: Option<String>,
    /// リクエストのタイムアウト（秒）
    pub timeout_secs: Option<u64>,
}
