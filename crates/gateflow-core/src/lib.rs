//! GateFlow の宣言ファイル (gate.kdl)
//!
//! モデル、チーム、チームメンバー、API キーの宣言を KDL から読み込み、
//! gateflow-cloud のリソース型に変換します。
//!
//! ```kdl
//! gateway {
//!     api_base "https://litellm.example.com"
//! }
//!
//! model "gpt-4" {
//!     provider "openai"
//!     base_model "gpt-4"
//! }
//!
//! team "research" {
//!     max_budget 100.0
//! }
//!
//! team-members "research" {
//!     member user_id="alice" role="admin"
//! }
//! ```

pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use error::{FlowError, Result};
pub use loader::load_declarations;
pub use model::{Declarations, GatewaySettings};
pub use parser::{parse_kdl_file, parse_kdl_string};
