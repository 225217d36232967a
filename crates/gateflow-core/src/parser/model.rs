//! model ノードのパース

use super::value::{
    arg, boolean, choice, field_name, integer, number, prop, resource_name, secret, string,
};
use crate::error::{FlowError, Result};
use gateflow_cloud::ModelSpec;
use kdl::KdlNode;

/// model ノードをパース
///
/// ```kdl
/// model "gpt-4" {
///     provider "openai"
///     base_model "gpt-4"
///     api_key env="OPENAI_API_KEY"
///     input_cost_per_million_tokens 30.0
/// }
/// ```
pub fn parse_model(node: &KdlNode) -> Result<(String, ModelSpec)> {
    let name = resource_name(node)?;
    let address = format!("model.{name}");

    let mut model = ModelSpec {
        model_name: name.clone(),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match field_name(child).as_str() {
                "model_name" => model.model_name = string(child, &address)?,
                "provider" | "custom_llm_provider" => {
                    model.custom_llm_provider = string(child, &address)?
                }
                "base_model" => model.base_model = string(child, &address)?,
                "tpm" => model.tpm = Some(integer(child, &address)?),
                "rpm" => model.rpm = Some(integer(child, &address)?),
                "reasoning_effort" => model.reasoning_effort = Some(choice(child, &address)?),
                "thinking" => {
                    // thinking #true budget_tokens=2048
                    model.thinking_enabled = match arg(child) {
                        Some(_) => boolean(child, &address)?,
                        None => true,
                    };
                    if let Some(budget) = prop(child, "budget_tokens") {
                        model.thinking_budget_tokens = budget
                            .as_integer()
                            .and_then(|v| u32::try_from(v).ok())
                            .ok_or_else(|| FlowError::InvalidValue {
                                address: address.clone(),
                                field: "thinking.budget_tokens".to_string(),
                                message: format!("expected a positive integer, got {budget}"),
                            })?;
                    }
                }
                "thinking_enabled" => model.thinking_enabled = boolean(child, &address)?,
                "thinking_budget_tokens" => {
                    model.thinking_budget_tokens = integer(child, &address)?
                }
                "api_key" | "model_api_key" => model.model_api_key = Some(secret(child, &address)?),
                "api_base" | "model_api_base" => {
                    model.model_api_base = Some(string(child, &address)?)
                }
                "api_version" => model.api_version = Some(string(child, &address)?),
                "tier" => model.tier = string(child, &address)?,
                "mode" => model.mode = Some(choice(child, &address)?),
                "input_cost_per_million_tokens" => {
                    model.input_cost_per_million_tokens = Some(number(child, &address)?)
                }
                "output_cost_per_million_tokens" => {
                    model.output_cost_per_million_tokens = Some(number(child, &address)?)
                }
                "input_cost_per_pixel" => {
                    model.input_cost_per_pixel = Some(number(child, &address)?)
                }
                "output_cost_per_pixel" => {
                    model.output_cost_per_pixel = Some(number(child, &address)?)
                }
                "input_cost_per_second" => {
                    model.input_cost_per_second = Some(number(child, &address)?)
                }
                "output_cost_per_second" => {
                    model.output_cost_per_second = Some(number(child, &address)?)
                }
                "aws_access_key_id" => model.aws_access_key_id = Some(secret(child, &address)?),
                "aws_secret_access_key" => {
                    model.aws_secret_access_key = Some(secret(child, &address)?)
                }
                "aws_region_name" => model.aws_region_name = Some(string(child, &address)?),
                "vertex_project" => model.vertex_project = Some(string(child, &address)?),
                "vertex_location" => model.vertex_location = Some(string(child, &address)?),
                "vertex_credentials" => {
                    model.vertex_credentials = Some(secret(child, &address)?)
                }
                other => {
                    return Err(FlowError::UnknownField {
                        address,
                        field: other.to_string(),
                    });
                }
            }
        }
    }

    if model.custom_llm_provider.is_empty() {
        return Err(FlowError::MissingField {
            address,
            field: "provider".to_string(),
        });
    }
    if model.base_model.is_empty() {
        return Err(FlowError::MissingField {
            address,
            field: "base_model".to_string(),
        });
    }

    Ok((name, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateflow_cloud::{ModelMode, ReasoningEffort};

    fn parse(kdl: &str) -> Result<(String, ModelSpec)> {
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        parse_model(doc.nodes().first().unwrap())
    }

    #[test]
    fn test_parse_model() {
        let (name, model) = parse(
            r#"
            model "gpt-4" {
                provider "openai"
                base_model "gpt-4"
                tpm 100000
                rpm 1000
                tier "paid"
                mode "chat"
                input_cost_per_million_tokens 30
                output_cost_per_million_tokens 60.0
            }
        "#,
        )
        .unwrap();

        assert_eq!(name, "gpt-4");
        assert_eq!(model.model_name, "gpt-4");
        assert_eq!(model.custom_llm_provider, "openai");
        assert_eq!(model.tpm, Some(100000));
        assert_eq!(model.tier, "paid");
        assert_eq!(model.mode, Some(ModelMode::Chat));
        assert_eq!(model.input_cost_per_million_tokens, Some(30.0));
        assert_eq!(model.output_cost_per_million_tokens, Some(60.0));
        assert_eq!(model.derived_name().unwrap(), "openai/gpt-4");
    }

    #[test]
    fn test_parse_model_defaults() {
        let (_, model) = parse(
            r#"
            model "claude" {
                provider "anthropic"
                base-model "claude-3-5-sonnet"
                model-name "claude-sonnet"
            }
        "#,
        )
        .unwrap();

        assert_eq!(model.model_name, "claude-sonnet");
        assert_eq!(model.base_model, "claude-3-5-sonnet");
        assert_eq!(model.tier, "free");
        assert!(!model.thinking_enabled);
        assert_eq!(model.thinking_budget_tokens, 1024);
    }

    #[test]
    fn test_parse_thinking_and_reasoning() {
        let (_, model) = parse(
            r#"
            model "sonnet" {
                provider "anthropic"
                base_model "claude-3-7-sonnet"
                reasoning_effort "high"
                thinking #true budget_tokens=4096
            }
        "#,
        )
        .unwrap();

        assert_eq!(model.reasoning_effort, Some(ReasoningEffort::High));
        assert!(model.thinking_enabled);
        assert_eq!(model.thinking_budget_tokens, 4096);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let result = parse(
            r#"
            model "m" {
                provider "openai"
                base_model "gpt-4"
                mode "video"
            }
        "#,
        );
        assert!(matches!(result, Err(FlowError::InvalidValue { ref field, .. }) if field == "mode"));
    }

    #[test]
    fn test_missing_provider() {
        let result = parse(r#"model "m" { base_model "gpt-4"; }"#);
        assert!(
            matches!(result, Err(FlowError::MissingField { ref field, .. }) if field == "provider")
        );
    }

    #[test]
    fn test_unknown_field() {
        let result = parse(
            r#"
            model "m" {
                provider "openai"
                base_model "gpt-4"
                temperature 0.2
            }
        "#,
        );
        assert!(matches!(result, Err(FlowError::UnknownField { .. })));
    }
}
