//! ノード値の取り出し
//!
//! フィールド名はハイフンとアンダースコアのどちらでも書けます
//! (`max-budget` と `max_budget` は同じ)。

use crate::error::{FlowError, Result};
use kdl::{KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::str::FromStr;

/// ハイフンをアンダースコアに揃えたノード名
pub(crate) fn field_name(node: &KdlNode) -> String {
    node.name().value().replace('-', "_")
}

/// 最初の位置引数
pub(crate) fn arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

/// プロパティ (`key=value`)
pub(crate) fn prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .map(|e| e.value())
}

/// リソースノードの名前（最初の引数）
pub(crate) fn resource_name(node: &KdlNode) -> Result<String> {
    arg(node)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            FlowError::InvalidConfig(format!("{} requires a name", node.name().value()))
        })
}

fn invalid(node: &KdlNode, address: &str, message: impl Into<String>) -> FlowError {
    FlowError::InvalidValue {
        address: address.to_string(),
        field: field_name(node),
        message: message.into(),
    }
}

fn missing(node: &KdlNode, address: &str) -> FlowError {
    FlowError::MissingField {
        address: address.to_string(),
        field: field_name(node),
    }
}

pub(crate) fn string(node: &KdlNode, address: &str) -> Result<String> {
    match arg(node) {
        Some(value) => value
            .as_string()
            .map(|s| s.to_string())
            .ok_or_else(|| invalid(node, address, format!("expected a string, got {value}"))),
        None => Err(missing(node, address)),
    }
}

/// 全ての位置引数を文字列として取得
pub(crate) fn strings(node: &KdlNode, address: &str) -> Result<Vec<String>> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| {
            e.value()
                .as_string()
                .map(|s| s.to_string())
                .ok_or_else(|| invalid(node, address, format!("expected strings, got {}", e.value())))
        })
        .collect()
}

/// 非負の整数
pub(crate) fn integer<T: TryFrom<i128>>(node: &KdlNode, address: &str) -> Result<T> {
    let Some(value) = arg(node) else {
        return Err(missing(node, address));
    };
    let raw = value
        .as_integer()
        .ok_or_else(|| invalid(node, address, format!("expected an integer, got {value}")))?;
    T::try_from(raw).map_err(|_| invalid(node, address, format!("out of range: {raw}")))
}

/// 整数も受け付ける浮動小数点数
pub(crate) fn number(node: &KdlNode, address: &str) -> Result<f64> {
    let Some(value) = arg(node) else {
        return Err(missing(node, address));
    };
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| invalid(node, address, format!("expected a number, got {value}")))
}

pub(crate) fn boolean(node: &KdlNode, address: &str) -> Result<bool> {
    let Some(value) = arg(node) else {
        return Err(missing(node, address));
    };
    value
        .as_bool()
        .ok_or_else(|| invalid(node, address, format!("expected #true or #false, got {value}")))
}

/// 列挙値をパース
pub(crate) fn choice<T>(node: &KdlNode, address: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    string(node, address)?
        .parse()
        .map_err(|e: T::Err| invalid(node, address, e.to_string()))
}

/// 秘密情報
///
/// 値を直接書くか、`env="VAR"` で環境変数から読み込みます。
/// 環境変数の値はログに出しません。
pub(crate) fn secret(node: &KdlNode, address: &str) -> Result<String> {
    if let Some(var) = prop(node, "env").and_then(|v| v.as_string()) {
        return std::env::var(var).map_err(|_| FlowError::MissingEnvVar {
            var: var.to_string(),
            address: address.to_string(),
        });
    }
    string(node, address)
}

/// 子ノードを `key "value"` のマップとして取得
///
/// 例: `metadata { owner "ml-platform"; cost_center "1234" }`
pub(crate) fn string_map(node: &KdlNode, address: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value().to_string();
            let value = match arg(child) {
                Some(KdlValue::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(missing(child, address)),
            };
            map.insert(key, value);
        }
    }
    Ok(map)
}
