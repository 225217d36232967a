//! Model deployments (`/model/*`)

use super::{
    Endpoints, IdentityPolicy, ManagedResource, ResourceKind, UpdateNotFound, from_body,
    note_change, note_cost, note_set, overlay, to_payload,
};
use crate::cost;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIER: &str = "free";
pub const DEFAULT_THINKING_BUDGET_TOKENS: u32 = 1024;

/// Reasoning effort hint forwarded to the upstream provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl std::str::FromStr for ReasoningEffort {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(CloudError::InvalidConfig(format!(
                "reasoning_effort must be one of low, medium, high (got {other})"
            ))),
        }
    }
}

/// Model mode as understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    Completion,
    Embedding,
    ImageGeneration,
    Chat,
    Moderation,
    AudioTranscription,
}

impl ModelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelMode::Completion => "completion",
            ModelMode::Embedding => "embedding",
            ModelMode::ImageGeneration => "image_generation",
            ModelMode::Chat => "chat",
            ModelMode::Moderation => "moderation",
            ModelMode::AudioTranscription => "audio_transcription",
        }
    }
}

impl std::str::FromStr for ModelMode {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "completion" => Ok(ModelMode::Completion),
            "embedding" => Ok(ModelMode::Embedding),
            "image_generation" => Ok(ModelMode::ImageGeneration),
            "chat" => Ok(ModelMode::Chat),
            "moderation" => Ok(ModelMode::Moderation),
            "audio_transcription" => Ok(ModelMode::AudioTranscription),
            other => Err(CloudError::InvalidConfig(format!("unknown model mode: {other}"))),
        }
    }
}

/// Declared model deployment
///
/// Secret fields are never written to the state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// User-facing alias clients request
    pub model_name: String,
    pub custom_llm_provider: String,
    pub base_model: String,
    pub tpm: Option<u64>,
    pub rpm: Option<u64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub thinking_enabled: bool,
    pub thinking_budget_tokens: u32,
    #[serde(skip_serializing, default)]
    pub model_api_key: Option<String>,
    pub model_api_base: Option<String>,
    pub api_version: Option<String>,
    pub tier: String,
    pub mode: Option<ModelMode>,
    pub input_cost_per_million_tokens: Option<f64>,
    pub output_cost_per_million_tokens: Option<f64>,
    pub input_cost_per_pixel: Option<f64>,
    pub output_cost_per_pixel: Option<f64>,
    pub input_cost_per_second: Option<f64>,
    pub output_cost_per_second: Option<f64>,
    #[serde(skip_serializing, default)]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub aws_secret_access_key: Option<String>,
    pub aws_region_name: Option<String>,
    pub vertex_project: Option<String>,
    pub vertex_location: Option<String>,
    #[serde(skip_serializing, default)]
    pub vertex_credentials: Option<String>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            custom_llm_provider: String::new(),
            base_model: String::new(),
            tpm: None,
            rpm: None,
            reasoning_effort: None,
            thinking_enabled: false,
            thinking_budget_tokens: DEFAULT_THINKING_BUDGET_TOKENS,
            model_api_key: None,
            model_api_base: None,
            api_version: None,
            tier: DEFAULT_TIER.to_string(),
            mode: None,
            input_cost_per_million_tokens: None,
            output_cost_per_million_tokens: None,
            input_cost_per_pixel: None,
            output_cost_per_pixel: None,
            input_cost_per_second: None,
            output_cost_per_second: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region_name: None,
            vertex_project: None,
            vertex_location: None,
            vertex_credentials: None,
        }
    }
}

impl ModelSpec {
    pub fn new(
        model_name: impl Into<String>,
        provider: impl Into<String>,
        base_model: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            custom_llm_provider: provider.into(),
            base_model: base_model.into(),
            ..Default::default()
        }
    }

    /// Name the gateway indexes the deployment on
    pub fn derived_name(&self) -> Result<String> {
        derive_model_name(&self.custom_llm_provider, &self.base_model)
    }

    /// Fields where the observed deployment differs from this declaration.
    /// Secrets are not compared because the gateway masks them.
    pub fn drift(&self, observed: &ModelSpec) -> Vec<String> {
        let mut changes = Vec::new();
        note_change(&mut changes, "model_name", &self.model_name, &observed.model_name);
        note_change(
            &mut changes,
            "custom_llm_provider",
            &self.custom_llm_provider,
            &observed.custom_llm_provider,
        );
        note_change(&mut changes, "base_model", &self.base_model, &observed.base_model);
        note_change(&mut changes, "tier", &self.tier, &observed.tier);
        note_set(&mut changes, "tpm", &self.tpm, &observed.tpm);
        note_set(&mut changes, "rpm", &self.rpm, &observed.rpm);
        note_set(
            &mut changes,
            "reasoning_effort",
            &self.reasoning_effort,
            &observed.reasoning_effort,
        );
        note_set(&mut changes, "model_api_base", &self.model_api_base, &observed.model_api_base);
        note_set(&mut changes, "api_version", &self.api_version, &observed.api_version);
        note_set(&mut changes, "mode", &self.mode, &observed.mode);
        note_set(&mut changes, "aws_region_name", &self.aws_region_name, &observed.aws_region_name);
        note_set(&mut changes, "vertex_project", &self.vertex_project, &observed.vertex_project);
        note_set(&mut changes, "vertex_location", &self.vertex_location, &observed.vertex_location);
        note_cost(
            &mut changes,
            "input_cost_per_million_tokens",
            self.input_cost_per_million_tokens,
            observed.input_cost_per_million_tokens,
        );
        note_cost(
            &mut changes,
            "output_cost_per_million_tokens",
            self.output_cost_per_million_tokens,
            observed.output_cost_per_million_tokens,
        );
        note_cost(
            &mut changes,
            "input_cost_per_pixel",
            self.input_cost_per_pixel,
            observed.input_cost_per_pixel,
        );
        note_cost(
            &mut changes,
            "output_cost_per_pixel",
            self.output_cost_per_pixel,
            observed.output_cost_per_pixel,
        );
        note_cost(
            &mut changes,
            "input_cost_per_second",
            self.input_cost_per_second,
            observed.input_cost_per_second,
        );
        note_cost(
            &mut changes,
            "output_cost_per_second",
            self.output_cost_per_second,
            observed.output_cost_per_second,
        );
        if self.thinking_enabled {
            note_change(
                &mut changes,
                "thinking_budget_tokens",
                &self.thinking_budget_tokens,
                &observed.thinking_budget_tokens,
            );
        }
        note_change(
            &mut changes,
            "thinking_enabled",
            &self.thinking_enabled,
            &observed.thinking_enabled,
        );
        changes
    }
}

/// `"<provider>/<base_model>"`
pub fn derive_model_name(provider: &str, base_model: &str) -> Result<String> {
    if provider.trim().is_empty() {
        return Err(CloudError::InvalidConfig(
            "model provider must not be empty".to_string(),
        ));
    }
    if base_model.trim().is_empty() {
        return Err(CloudError::InvalidConfig(
            "base model must not be empty".to_string(),
        ));
    }
    Ok(format!("{provider}/{base_model}"))
}

// ============ Wire Types ============

/// `litellm_params` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteLlmParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_llm_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tpm: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cost_per_token: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cost_per_token: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cost_per_pixel: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cost_per_pixel: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cost_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cost_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_credentials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Thinking>,
}

/// Extended thinking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thinking {
    #[serde(rename = "type")]
    pub kind: String,
    pub budget_tokens: u32,
}

/// `model_info` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub db_model: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModelRequest {
    model_name: String,
    litellm_params: LiteLlmParams,
    model_info: ModelInfo,
}

/// Deployment as reported by `/model/info`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelRecord {
    pub model_name: String,
    pub litellm_params: LiteLlmParams,
    pub model_info: ModelInfo,
}

/// Model deployments
pub struct ModelResource;

fn deployment_id(value: &serde_json::Value) -> Option<&str> {
    value.pointer("/model_info/id").and_then(|id| id.as_str())
}

fn single_deployment(identity: &str, value: serde_json::Value) -> Result<Option<ModelRecord>> {
    match deployment_id(&value) {
        Some(id) if id != identity => Ok(None),
        _ => Ok(Some(from_body(value)?)),
    }
}

impl ManagedResource for ModelResource {
    type Desired = ModelSpec;
    type Remote = ModelRecord;
    type Tracked = ModelSpec;

    const KIND: ResourceKind = ResourceKind::Model;
    const ENDPOINTS: Endpoints = Endpoints {
        create: "/model/new",
        read: "/model/info",
        read_param: "id",
        update: "/model/update",
        delete: "/model/delete",
    };
    const IDENTITY: IdentityPolicy = IdentityPolicy::LocalUuid;
    const ON_UPDATE_NOT_FOUND: UpdateNotFound = UpdateNotFound::RecreateOnce;

    fn validate(desired: &ModelSpec) -> Result<()> {
        if desired.model_name.trim().is_empty() {
            return Err(CloudError::InvalidConfig(
                "model_name must not be empty".to_string(),
            ));
        }
        desired.derived_name()?;
        let costs = [
            ("input_cost_per_million_tokens", desired.input_cost_per_million_tokens),
            ("output_cost_per_million_tokens", desired.output_cost_per_million_tokens),
            ("input_cost_per_pixel", desired.input_cost_per_pixel),
            ("output_cost_per_pixel", desired.output_cost_per_pixel),
            ("input_cost_per_second", desired.input_cost_per_second),
            ("output_cost_per_second", desired.output_cost_per_second),
        ];
        for (field, value) in costs {
            if let Some(v) = value
                && !(v >= 0.0 && v.is_finite())
            {
                return Err(CloudError::InvalidConfig(format!(
                    "{field} must be a non-negative number (got {v})"
                )));
            }
        }
        Ok(())
    }

    fn write_payload(desired: &ModelSpec, identity: Option<&str>) -> Result<serde_json::Value> {
        let identity = identity.ok_or_else(|| {
            CloudError::InvalidConfig("model identity must be assigned before write".to_string())
        })?;

        let thinking = desired.thinking_enabled.then(|| Thinking {
            kind: "enabled".to_string(),
            budget_tokens: desired.thinking_budget_tokens,
        });

        let request = ModelRequest {
            model_name: desired.model_name.clone(),
            litellm_params: LiteLlmParams {
                custom_llm_provider: Some(desired.custom_llm_provider.clone()),
                tpm: desired.tpm,
                rpm: desired.rpm,
                api_key: desired.model_api_key.clone(),
                api_base: desired.model_api_base.clone(),
                api_version: desired.api_version.clone(),
                model: Some(desired.derived_name()?),
                input_cost_per_token: desired.input_cost_per_million_tokens.map(cost::to_per_unit),
                output_cost_per_token: desired
                    .output_cost_per_million_tokens
                    .map(cost::to_per_unit),
                input_cost_per_pixel: desired.input_cost_per_pixel,
                output_cost_per_pixel: desired.output_cost_per_pixel,
                input_cost_per_second: desired.input_cost_per_second,
                output_cost_per_second: desired.output_cost_per_second,
                aws_access_key_id: desired.aws_access_key_id.clone(),
                aws_secret_access_key: desired.aws_secret_access_key.clone(),
                aws_region_name: desired.aws_region_name.clone(),
                vertex_project: desired.vertex_project.clone(),
                vertex_location: desired.vertex_location.clone(),
                vertex_credentials: desired.vertex_credentials.clone(),
                reasoning_effort: desired.reasoning_effort.map(|r| r.as_str().to_string()),
                thinking,
            },
            model_info: ModelInfo {
                id: Some(identity.to_string()),
                db_model: true,
                base_model: Some(desired.base_model.clone()),
                tier: Some(desired.tier.clone()),
                mode: desired.mode.map(|m| m.as_str().to_string()),
            },
        };

        to_payload(&request)
    }

    fn delete_payload(identity: &str) -> serde_json::Value {
        serde_json::json!({ "id": identity })
    }

    /// Accepts either a bare deployment or `{"data": [deployment, ...]}`.
    ///
    /// Only the entry whose `model_info.id` is `identity` counts; a list
    /// without it means the deployment is gone. A bare deployment that
    /// reports no id at all is taken as the one asked for.
    fn decode_remote(identity: &str, body: serde_json::Value) -> Result<Option<ModelRecord>> {
        match body {
            serde_json::Value::Object(mut map) => match map.remove("data") {
                Some(serde_json::Value::Array(items)) => items
                    .into_iter()
                    .find(|item| deployment_id(item) == Some(identity))
                    .map(from_body)
                    .transpose(),
                Some(serde_json::Value::Null) => Ok(None),
                Some(data) => single_deployment(identity, data),
                None => single_deployment(identity, serde_json::Value::Object(map)),
            },
            other => single_deployment(identity, other),
        }
    }

    fn track(desired: Option<&ModelSpec>, remote: ModelRecord) -> ModelSpec {
        let mut spec = desired.cloned().unwrap_or_default();
        let ModelRecord {
            model_name,
            litellm_params: params,
            model_info: info,
        } = remote;

        if !model_name.is_empty() {
            spec.model_name = model_name;
        }
        if let Some(provider) = params.custom_llm_provider {
            spec.custom_llm_provider = provider;
        } else if spec.custom_llm_provider.is_empty()
            && let Some((provider, _)) = params.model.as_deref().and_then(|m| m.split_once('/'))
        {
            spec.custom_llm_provider = provider.to_string();
        }
        if let Some(base) = info.base_model {
            spec.base_model = base;
        } else if spec.base_model.is_empty()
            && let Some((_, base)) = params.model.as_deref().and_then(|m| m.split_once('/'))
        {
            spec.base_model = base.to_string();
        }
        if let Some(tier) = info.tier {
            spec.tier = tier;
        }
        if let Some(mode) = info.mode.and_then(|m| m.parse().ok()) {
            spec.mode = Some(mode);
        }

        overlay(&mut spec.tpm, params.tpm);
        overlay(&mut spec.rpm, params.rpm);
        overlay(&mut spec.model_api_base, params.api_base);
        overlay(&mut spec.api_version, params.api_version);
        overlay(&mut spec.aws_region_name, params.aws_region_name);
        overlay(&mut spec.vertex_project, params.vertex_project);
        overlay(&mut spec.vertex_location, params.vertex_location);
        overlay(
            &mut spec.input_cost_per_million_tokens,
            params.input_cost_per_token.map(cost::to_per_million),
        );
        overlay(
            &mut spec.output_cost_per_million_tokens,
            params.output_cost_per_token.map(cost::to_per_million),
        );
        overlay(&mut spec.input_cost_per_pixel, params.input_cost_per_pixel);
        overlay(&mut spec.output_cost_per_pixel, params.output_cost_per_pixel);
        overlay(&mut spec.input_cost_per_second, params.input_cost_per_second);
        overlay(&mut spec.output_cost_per_second, params.output_cost_per_second);
        overlay(
            &mut spec.reasoning_effort,
            params.reasoning_effort.and_then(|r| r.parse().ok()),
        );
        if let Some(thinking) = params.thinking {
            spec.thinking_enabled = thinking.kind == "enabled";
            spec.thinking_budget_tokens = thinking.budget_tokens;
        }

        // model_api_key, aws_access_key_id, aws_secret_access_key and
        // vertex_credentials come back masked or not at all; keep the declared values.
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gpt4() -> ModelSpec {
        ModelSpec {
            input_cost_per_million_tokens: Some(30.0),
            output_cost_per_million_tokens: Some(60.0),
            model_api_key: Some("sk-upstream".to_string()),
            ..ModelSpec::new("gpt-4", "openai", "gpt-4")
        }
    }

    #[test]
    fn test_derive_model_name() {
        assert_eq!(derive_model_name("openai", "gpt-4").unwrap(), "openai/gpt-4");
        assert_eq!(
            derive_model_name("bedrock", "anthropic.claude-v2").unwrap(),
            "bedrock/anthropic.claude-v2"
        );
    }

    #[test]
    fn test_derive_model_name_rejects_empty_parts() {
        assert!(matches!(
            derive_model_name("", "gpt-4"),
            Err(CloudError::InvalidConfig(_))
        ));
        assert!(matches!(
            derive_model_name("openai", "  "),
            Err(CloudError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_write_payload_shape() {
        let payload = ModelResource::write_payload(&gpt4(), Some("m-1")).unwrap();

        assert_eq!(payload["model_name"], "gpt-4");
        assert_eq!(payload["litellm_params"]["model"], "openai/gpt-4");
        assert_eq!(payload["litellm_params"]["custom_llm_provider"], "openai");
        assert_eq!(payload["litellm_params"]["api_key"], "sk-upstream");
        let per_token = payload["litellm_params"]["input_cost_per_token"]
            .as_f64()
            .unwrap();
        assert!((per_token - 0.00003).abs() < 1e-18);
        assert_eq!(payload["model_info"]["id"], "m-1");
        assert_eq!(payload["model_info"]["db_model"], true);
        assert_eq!(payload["model_info"]["tier"], "free");
        // unset optionals are omitted
        assert!(payload["litellm_params"].get("tpm").is_none());
        assert!(payload["litellm_params"].get("thinking").is_none());
    }

    #[test]
    fn test_write_payload_thinking() {
        let spec = ModelSpec {
            thinking_enabled: true,
            reasoning_effort: Some(ReasoningEffort::High),
            ..gpt4()
        };
        let payload = ModelResource::write_payload(&spec, Some("m-1")).unwrap();
        assert_eq!(
            payload["litellm_params"]["thinking"],
            json!({"type": "enabled", "budget_tokens": 1024})
        );
        assert_eq!(payload["litellm_params"]["reasoning_effort"], "high");
    }

    #[test]
    fn test_validate_rejects_negative_cost() {
        let spec = ModelSpec {
            input_cost_per_million_tokens: Some(-1.0),
            ..gpt4()
        };
        assert!(ModelResource::validate(&spec).is_err());
        assert!(ModelResource::validate(&gpt4()).is_ok());
    }

    #[test]
    fn test_decode_remote_variants() {
        let bare = json!({"model_name": "gpt-4", "model_info": {"id": "m-1"}});
        let record = ModelResource::decode_remote("m-1", bare).unwrap().unwrap();
        assert_eq!(record.model_name, "gpt-4");

        let no_id = json!({"model_name": "gpt-4"});
        assert!(ModelResource::decode_remote("m-1", no_id).unwrap().is_some());

        let wrapped = json!({"data": [{"model_name": "gpt-4", "model_info": {"id": "m-1"}}]});
        assert!(ModelResource::decode_remote("m-1", wrapped).unwrap().is_some());

        let empty = json!({"data": []});
        assert!(ModelResource::decode_remote("m-1", empty).unwrap().is_none());
    }

    /// The gateway may answer with every deployment sharing a name
    #[test]
    fn test_decode_remote_picks_entry_by_id() {
        let listing = json!({"data": [
            {"model_name": "gpt-4", "model_info": {"id": "m-other"}, "litellm_params": {"tpm": 1}},
            {"model_name": "gpt-4", "model_info": {"id": "m-1"}, "litellm_params": {"tpm": 2}},
        ]});
        let record = ModelResource::decode_remote("m-1", listing).unwrap().unwrap();
        assert_eq!(record.model_info.id.as_deref(), Some("m-1"));
        assert_eq!(record.litellm_params.tpm, Some(2));

        let others_only = json!({"data": [{"model_name": "gpt-4", "model_info": {"id": "m-other"}}]});
        assert!(ModelResource::decode_remote("m-1", others_only).unwrap().is_none());

        let unrelated = json!({"model_name": "gpt-4", "model_info": {"id": "m-other"}});
        assert!(ModelResource::decode_remote("m-1", unrelated).unwrap().is_none());
    }

    #[test]
    fn test_track_preserves_secrets_and_converts_costs() {
        let remote: ModelRecord = serde_json::from_value(json!({
            "model_name": "gpt-4",
            "litellm_params": {
                "custom_llm_provider": "openai",
                "model": "openai/gpt-4",
                "api_key": "sk-****",
                "input_cost_per_token": 0.00003,
                "tpm": 1000
            },
            "model_info": {"id": "m-1", "base_model": "gpt-4", "tier": "paid"}
        }))
        .unwrap();

        let tracked = ModelResource::track(Some(&gpt4()), remote);
        assert_eq!(tracked.model_api_key.as_deref(), Some("sk-upstream"));
        assert_eq!(tracked.tier, "paid");
        assert_eq!(tracked.tpm, Some(1000));
        let cost = tracked.input_cost_per_million_tokens.unwrap();
        assert!((cost - 30.0).abs() < 1e-9);
        // not echoed, kept from declaration
        assert_eq!(tracked.output_cost_per_million_tokens, Some(60.0));
    }

    #[test]
    fn test_drift() {
        let desired = gpt4();
        let mut observed = desired.clone();
        assert!(desired.drift(&observed).is_empty());

        observed.tier = "paid".to_string();
        observed.input_cost_per_million_tokens = Some(30.000000000001);
        let changes = desired.drift(&observed);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].starts_with("tier"));
    }

    #[test]
    fn test_track_without_declaration_reads_provider_from_model() {
        let remote: ModelRecord = serde_json::from_value(json!({
            "model_name": "gpt-4",
            "litellm_params": {"model": "openai/gpt-4"},
            "model_info": {"id": "m-1"}
        }))
        .unwrap();

        let tracked = ModelResource::track(None, remote);
        assert_eq!(tracked.custom_llm_provider, "openai");
        assert_eq!(tracked.base_model, "gpt-4");
        assert_eq!(tracked.tpm, None);
        assert!(ModelSpec::new("gpt-4", "openai", "gpt-4").drift(&tracked).is_empty());
    }

    #[test]
    fn test_state_serialization_skips_secrets() {
        let value = serde_json::to_value(gpt4()).unwrap();
        assert!(value.get("model_api_key").is_none());
        let back: ModelSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back.model_api_key, None);
        assert_eq!(back.base_model, "gpt-4");
    }
}
