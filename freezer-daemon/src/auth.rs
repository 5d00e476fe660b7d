//! Token authentication.
//!
//! Callers present a projected service-account token minted for a single
//! audience. The token is checked with a Kubernetes TokenReview and the
//! calling pod is read from the reviewed user's extra claims.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec, TokenReviewStatus};
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::types::PodIdentity;

/// Claim holding the UID of the pod the token was issued to.
pub const POD_UID_CLAIM: &str = "authentication.kubernetes.io/pod-uid";

/// Audience tokens must be minted for. Tokens for any other audience are
/// rejected, so they cannot be replayed against this daemon.
pub const DEFAULT_AUDIENCE: &str = "concurrency-state-hook";

/// Outcome of authenticating one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub authenticated: bool,
    pub username: Option<String>,
    /// Extra claims of the authenticated user.
    pub claims: BTreeMap<String, Vec<String>>,
}

impl AuthenticationResult {
    /// A rejected token.
    pub fn rejected() -> Self {
        Self::default()
    }

    /// An accepted token issued to the pod with the given UID.
    pub fn for_pod(uid: &str) -> Self {
        Self {
            authenticated: true,
            username: None,
            claims: BTreeMap::from([(POD_UID_CLAIM.to_string(), vec![uid.to_string()])]),
        }
    }

    /// Pod the token was issued to. `None` if unauthenticated or the claim
    /// is absent.
    pub fn pod_identity(&self) -> Option<PodIdentity> {
        if !self.authenticated {
            return None;
        }
        self.claims
            .get(POD_UID_CLAIM)
            .and_then(|values| values.first())
            .filter(|uid| !uid.is_empty())
            .map(PodIdentity::new)
    }
}

/// Validates bearer tokens.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Review `token`. An `Err` means the review itself could not be done.
    async fn authenticate(&self, token: &str) -> Result<AuthenticationResult, AuthError>;
}

/// Authenticator backed by the Kubernetes TokenReview API.
pub struct TokenReviewAuthenticator {
    client: Client,
    audience: String,
}

impl TokenReviewAuthenticator {
    pub fn new(client: Client, audience: impl Into<String>) -> Self {
        Self {
            client,
            audience: audience.into(),
        }
    }

    /// Build from the in-cluster (or kubeconfig) environment.
    pub async fn from_env(audience: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::try_default()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        Ok(Self::new(client, audience))
    }
}

#[async_trait]
impl Authenticator for TokenReviewAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticationResult, AuthError> {
        let reviews: Api<TokenReview> = Api::all(self.client.clone());
        let review = TokenReview {
            spec: TokenReviewSpec {
                token: Some(token.to_string()),
                audiences: Some(vec![self.audience.clone()]),
            },
            ..Default::default()
        };

        let reviewed = reviews
            .create(&PostParams::default(), &review)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(review_result(
            reviewed.status.unwrap_or_default(),
            &self.audience,
        ))
    }
}

/// Read a TokenReview status. A review whose audiences do not include
/// `audience` is a rejection.
fn review_result(status: TokenReviewStatus, audience: &str) -> AuthenticationResult {
    if let Some(error) = &status.error {
        debug!(error = %error, "TokenReview reported an error");
    }
    if !status.authenticated.unwrap_or(false) {
        return AuthenticationResult::rejected();
    }

    let audiences = status.audiences.unwrap_or_default();
    if !audiences.iter().any(|a| a == audience) {
        warn!(
            expected = %audience,
            audiences = ?audiences,
            "TokenReview did not confirm the token audience"
        );
        return AuthenticationResult::rejected();
    }

    let user = status.user.unwrap_or_default();
    AuthenticationResult {
        authenticated: true,
        username: user.username,
        claims: user.extra.unwrap_or_default(),
    }
}

/// Authenticator answering from a fixed token table. Unknown tokens are
/// rejected.
#[derive(Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, AuthenticationResult>,
    unavailable: bool,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An authenticator whose every review fails.
    pub fn unavailable() -> Self {
        Self {
            tokens: HashMap::new(),
            unavailable: true,
        }
    }

    pub fn with_token(mut self, token: &str, result: AuthenticationResult) -> Self {
        self.tokens.insert(token.to_string(), result);
        self
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticationResult, AuthError> {
        if self.unavailable {
            return Err(AuthError::Unavailable("authenticator unavailable".to_string()));
        }
        Ok(self
            .tokens
            .get(token)
            .cloned()
            .unwrap_or_else(AuthenticationResult::rejected))
    }
}
