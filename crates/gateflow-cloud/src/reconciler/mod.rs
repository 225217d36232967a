//! Convergence of declared resources against the gateway
//!
//! [`Reconciler`] drives create, read, update and delete for any
//! [`ManagedResource`]. Team membership goes through
//! [`MemberSetReconciler`], which applies a set diff instead.
//!
//! Each call awaits one request at a time. The only automatic retry is the
//! update-to-create fallback for kinds that allow it.

mod member_set;

pub use member_set::MemberSetReconciler;

use crate::classify::{Classification, ErrorClassifier, GatewayClassifier};
use crate::error::{CloudError, Result};
use crate::resource::{
    IdentityPolicy, KeyResource, ManagedResource, ModelResource, ResourceKind, TeamResource,
    UpdateNotFound, mask_key,
};
use crate::transport::{ApiRequest, Transport};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Fields whose values never appear in logs or error messages
const SENSITIVE_FIELDS: &[&str] = &[
    "api_key",
    "key",
    "keys",
    "aws_access_key_id",
    "aws_secret_access_key",
    "vertex_credentials",
];

/// Copy of `value` with credentials masked
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if SENSITIVE_FIELDS.contains(&k.as_str()) || k.contains("secret") {
                        mask_value(v)
                    } else {
                        redact(v)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(mask_key(s)),
        Value::Array(items) => Value::Array(items.iter().map(mask_value).collect()),
        Value::Null => Value::Null,
        _ => Value::String("****".to_string()),
    }
}

/// Sends requests and turns responses into results
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            classifier: Arc::new(GatewayClassifier::default()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Send one request and classify the response
    pub async fn call(&self, kind: ResourceKind, request: ApiRequest) -> Result<Value> {
        debug!(method = %request.method, path = %request.path, "API request");
        if let Some(body) = &request.body {
            trace!(body = %redact(body), "request body");
        }

        let response = self.transport.send(&request).await?;
        debug!(status = response.status, path = %request.path, "API response");

        match self.classifier.classify(&response) {
            Classification::Success(body) => {
                trace!(body = %redact(&body), "response body");
                Ok(body)
            }
            Classification::NotFound => Err(CloudError::NotFound {
                kind,
                path: request.path,
            }),
            Classification::Undecodable(message) => Err(CloudError::Serialization {
                message,
                payload: response.body,
            }),
            Classification::Failure => Err(CloudError::Api {
                status: response.status,
                body: response.body,
                request: request
                    .body
                    .as_ref()
                    .map(|b| redact(b).to_string())
                    .unwrap_or_default(),
            }),
        }
    }
}

/// How a converge call reached its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// The update target was gone and a new resource was created
    Recreated,
}

/// Result of a successful converge
#[derive(Debug, Clone)]
pub struct Converged<T> {
    pub identity: String,
    pub outcome: WriteOutcome,
    /// Attributes read back from the server
    pub state: T,
}

/// Generic create/read/update/delete driver
pub struct Reconciler<R: ManagedResource> {
    client: ApiClient,
    _kind: PhantomData<fn() -> R>,
}

pub type ModelReconciler = Reconciler<ModelResource>;
pub type TeamReconciler = Reconciler<TeamResource>;
pub type KeyReconciler = Reconciler<KeyResource>;

impl<R: ManagedResource> Clone for Reconciler<R> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<R: ManagedResource> Reconciler<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    /// Identity as it may appear in logs
    fn shown(identity: &str) -> String {
        match R::IDENTITY {
            IdentityPolicy::LocalUuid => identity.to_string(),
            IdentityPolicy::ServerAssigned => mask_key(identity),
        }
    }

    /// Create the resource when `existing` is `None`, otherwise update it.
    ///
    /// An update the server answers with "not found" is retried once as a
    /// create with a fresh identity when the kind allows it. A create is
    /// never retried.
    pub async fn converge(
        &self,
        desired: &R::Desired,
        existing: Option<&str>,
    ) -> Result<Converged<R::Tracked>> {
        R::validate(desired)?;

        let Some(identity) = existing else {
            return self.create(desired, WriteOutcome::Created).await;
        };

        match self.update(desired, identity).await {
            Ok(state) => Ok(Converged {
                identity: identity.to_string(),
                outcome: WriteOutcome::Updated,
                state,
            }),
            Err(e) if e.is_not_found() && R::ON_UPDATE_NOT_FOUND == UpdateNotFound::RecreateOnce => {
                warn!(
                    kind = %R::KIND,
                    identity = %Self::shown(identity),
                    "update target no longer exists, creating it again"
                );
                self.create(desired, WriteOutcome::Recreated).await
            }
            Err(e) => Err(e),
        }
    }

    async fn create(
        &self,
        desired: &R::Desired,
        outcome: WriteOutcome,
    ) -> Result<Converged<R::Tracked>> {
        let local = match R::IDENTITY {
            IdentityPolicy::LocalUuid => Some(uuid::Uuid::new_v4().to_string()),
            IdentityPolicy::ServerAssigned => None,
        };

        let payload = R::write_payload(desired, local.as_deref())?;
        let response = self
            .client
            .call(R::KIND, ApiRequest::post(R::ENDPOINTS.create, payload))
            .await?;

        let identity = match local {
            Some(id) => id,
            None => R::identity_from_response(&response).ok_or_else(|| {
                CloudError::Serialization {
                    message: format!("{} create response carries no identity", R::KIND),
                    payload: redact(&response).to_string(),
                }
            })?,
        };

        info!(kind = %R::KIND, identity = %Self::shown(&identity), "created");

        let state = self.read_back(desired, &identity).await?;
        Ok(Converged {
            identity,
            outcome,
            state,
        })
    }

    async fn update(&self, desired: &R::Desired, identity: &str) -> Result<R::Tracked> {
        let payload = R::write_payload(desired, Some(identity))?;
        self.client
            .call(R::KIND, ApiRequest::post(R::ENDPOINTS.update, payload))
            .await?;

        info!(kind = %R::KIND, identity = %Self::shown(identity), "updated");

        self.read_back(desired, identity).await
    }

    /// Read after a successful write. Any failure here keeps the identity.
    async fn read_back(&self, desired: &R::Desired, identity: &str) -> Result<R::Tracked> {
        let partial = |source: CloudError| CloudError::PartialApply {
            kind: R::KIND,
            identity: identity.to_string(),
            source: Box::new(source),
        };

        match self.read(identity, Some(desired)).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(partial(CloudError::NotFound {
                kind: R::KIND,
                path: R::ENDPOINTS.read.to_string(),
            })),
            Err(source) => Err(partial(source)),
        }
    }

    /// Fetch the resource. `Ok(None)` means the server no longer has it.
    pub async fn read(
        &self,
        identity: &str,
        desired: Option<&R::Desired>,
    ) -> Result<Option<R::Tracked>> {
        let request = R::ENDPOINTS.read_request(identity);
        match self.client.call(R::KIND, request).await {
            Ok(body) => match R::decode_remote(identity, body)? {
                Some(remote) => Ok(Some(R::track(desired, remote))),
                None => {
                    warn!(kind = %R::KIND, identity = %Self::shown(identity), "not present on server");
                    Ok(None)
                }
            },
            Err(e) if e.is_not_found() => {
                warn!(kind = %R::KIND, identity = %Self::shown(identity), "not present on server");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the resource. A resource that is already gone counts as deleted.
    pub async fn delete(&self, identity: &str) -> Result<()> {
        let request = ApiRequest::post(R::ENDPOINTS.delete, R::delete_payload(identity));
        match self.client.call(R::KIND, request).await {
            Ok(_) => {
                info!(kind = %R::KIND, identity = %Self::shown(identity), "deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(kind = %R::KIND, identity = %Self::shown(identity), "already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
