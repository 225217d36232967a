//! モデル定義
//!
//! gate.kdl から読み込まれる宣言を表します。
//! リソース本体の型は gateflow-cloud のものをそのまま使います。

mod declarations;
mod gateway;

// Re-exports
pub use declarations::*;
pub use gateway::*;
