//! gateway ノードのパース

use super::value::{field_name, integer, string};
use crate::error::{FlowError, Result};
use crate::model::GatewaySettings;
use kdl::KdlNode;

/// gateway ノードをパース
///
/// ```kdl
/// gateway {
///     api_base "https://litellm.example.com"
///     timeout 30
/// }
/// ```
///
/// API キーはファイルに書かず、環境変数 `LITELLM_API_KEY` で渡します。
pub fn parse_gateway(node: &KdlNode) -> Result<GatewaySettings> {
    let address = "gateway";
    let mut gateway = GatewaySettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match field_name(child).as_str() {
                "api_base" => gateway.api_base = Some(string(child, address)?),
                "timeout" | "timeout_secs" => gateway.timeout_secs = Some(integer(child, address)?),
                other => {
                    return Err(FlowError::UnknownField {
                        address: address.to_string(),
                        field: other.to_string(),
                    });
                }
            }
        }
    }

    Ok(gateway)
}
