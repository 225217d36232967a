//! GateFlow reconciliation engine
//!
//! This crate converges declared LLM gateway objects (models, teams, team
//! membership and API keys) with the gateway's control-plane API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    gate CLI                      │
//! │              (plan / apply / destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                gateflow-cloud                    │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  Reconciler  │  │  MemberSetReconciler     │ │
//! │  │  <Resource>  │  │  (set diff)              │ │
//! │  └──────┬───────┘  └────────────┬─────────────┘ │
//! │         └───────────┬───────────┘               │
//! │  ┌──────────────────▼──────────┐ ┌────────────┐ │
//! │  │ ApiClient = Transport +     │ │ State Mgmt │ │
//! │  │             ErrorClassifier │ └────────────┘ │
//! │  └─────────────────────────────┘                │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼────────┐
//!           │ litellm        │
//!           │ HTTP transport │
//!           └────────────────┘
//! ```

pub mod action;
pub mod classify;
pub mod cost;
pub mod diff;
pub mod error;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod state;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use action::{Action, ActionType, ApplyResult, Plan, PlanSummary, RefreshResult};
pub use classify::{Classification, ErrorClassifier, GatewayClassifier};
pub use diff::{MembershipDiff, diff};
pub use error::{CloudError, Result};
pub use provider::{GatewayProvider, ResourceSet};
pub use reconciler::{
    ApiClient, Converged, KeyReconciler, MemberSetReconciler, ModelReconciler, Reconciler,
    TeamReconciler, WriteOutcome, redact,
};
pub use resource::{
    IdentityKey, KeySpec, ManagedResource, MemberRole, MemberSetSpec, MembershipEntry,
    MembershipSet, ModelMode, ModelSpec, ReasoningEffort, ResourceKind, TeamRef, TeamSpec,
};
pub use state::{GlobalState, ResourceState, StateLock, StateManager};
pub use transport::{ApiRequest, ApiResponse, Method, Transport};
