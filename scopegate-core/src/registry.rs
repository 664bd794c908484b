//! Scope registry
//!
//! Scopes are validated and indexed into a [`RegistrySnapshot`] built off to the
//! side, then published with a single atomic swap. Readers load the current
//! snapshot without locking and never observe a partially built trie.
//!
//! The root token is assigned once per process. [`ScopeRegistry::reset`] only
//! recovers from a failed initialization: once the token is assigned the
//! published scopes stay in place and the registry can't be initialized again.

use crate::collaborators::Collaborators;
use crate::error::{Result, ScopeGateError};
use crate::roles::provision_admin_role;
use crate::token::generate_token;
use crate::trie::RouteTrie;
use crate::types::{Method, Scope, ScopeDefinition, ScopeIndex};
use ahash::AHashMap;
use arc_swap::ArcSwapOption;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Immutable, fully built set of scopes
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    scopes: Vec<Scope>,
    names: AHashMap<String, ScopeIndex>,
    trie: RouteTrie,
}

impl RegistrySnapshot {
    /// Validate and index scopes in order. Fails on the first invalid or duplicate scope.
    pub fn build(definitions: impl IntoIterator<Item = ScopeDefinition>) -> Result<Self> {
        let mut snapshot = RegistrySnapshot::default();

        for definition in definitions {
            let scope = definition.validate()?;
            if snapshot.names.contains_key(&scope.name) {
                return Err(ScopeGateError::DuplicateScope(scope.name));
            }

            let index = ScopeIndex(snapshot.scopes.len());
            snapshot.trie.add_route(scope.method, &scope.uri, index);
            snapshot.names.insert(scope.name.clone(), index);
            snapshot.scopes.push(scope);
        }

        Ok(snapshot)
    }

    /// Scopes in registration order
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Scope behind an index
    pub fn scope(&self, index: ScopeIndex) -> Option<&Scope> {
        self.scopes.get(index.0)
    }

    /// Index of a scope name
    pub fn index_of(&self, name: &str) -> Option<ScopeIndex> {
        self.names.get(name).copied()
    }

    /// Whether a scope with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Scope names in registration order
    pub fn names(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.name.clone()).collect()
    }

    /// Indices of the scopes governing `method url`
    pub fn matching_scopes(&self, method: Method, url: &str) -> Vec<ScopeIndex> {
        self.trie.matching_scopes(method, url)
    }

    /// The underlying route trie
    pub fn trie(&self) -> &RouteTrie {
        &self.trie
    }

    /// Number of scopes
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether there are no scopes
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Process-wide registry state: published snapshot plus the root token
#[derive(Default)]
pub struct ScopeRegistry {
    snapshot: ArcSwapOption<RegistrySnapshot>,
    root_token: OnceLock<String>,
    init_lock: Mutex<()>,
}

impl ScopeRegistry {
    /// Create an uninitialized registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definitions`, provision the OAuth2 client and admin role, and
    /// return the root token. The token is handed out exactly once.
    #[instrument(skip_all, fields(scopes = definitions.len()))]
    pub async fn initialize(
        &self,
        definitions: Vec<ScopeDefinition>,
        collaborators: &Collaborators,
    ) -> Result<String> {
        let _guard = self.init_lock.lock().await;

        if self.root_token.get().is_some() {
            return Err(ScopeGateError::AlreadyInitialized);
        }

        let snapshot = RegistrySnapshot::build(definitions)?;
        let names = snapshot.names();

        let client = collaborators.issuer.register_client(&names).await?;
        info!(client_id = %client.client_id, scopes = ?names, "registered root client");

        provision_admin_role(collaborators.policy.as_ref(), &names).await?;

        let token = generate_token();
        self.snapshot.store(Some(Arc::new(snapshot)));
        self.root_token
            .set(token.clone())
            .map_err(|_| ScopeGateError::AlreadyInitialized)?;

        info!("scope registry initialized with {} scopes", names.len());
        Ok(token)
    }

    /// Registered scopes in registration order
    pub fn scopes(&self) -> Result<Vec<Scope>> {
        if !self.is_initialized() {
            return Err(ScopeGateError::NotInitialized);
        }

        Ok(self
            .snapshot
            .load_full()
            .map(|s| s.scopes().to_vec())
            .unwrap_or_default())
    }

    /// Current snapshot, if any was published
    pub fn snapshot(&self) -> Option<Arc<RegistrySnapshot>> {
        self.snapshot.load_full()
    }

    /// Drop scopes left behind by a failed initialization. A no-op once the
    /// root token is assigned.
    pub fn reset(&self) {
        if self.is_initialized() {
            warn!("scope registry is initialized; reset ignored");
            return;
        }
        if self.snapshot.swap(None).is_some() {
            warn!("scope registry reset; published scopes dropped");
        } else {
            debug!("scope registry reset with nothing published");
        }
    }

    /// Whether a root token was assigned
    pub fn is_initialized(&self) -> bool {
        self.root_token.get().is_some()
    }

    /// Whether `token` is the root token. Before initialization every token is
    /// treated as root so the service can be bootstrapped.
    pub fn is_root_token(&self, token: &str) -> bool {
        match self.root_token.get() {
            Some(root) => root == token,
            None => {
                debug!("scopes haven't been initialized, allowing request");
                true
            }
        }
    }
}
