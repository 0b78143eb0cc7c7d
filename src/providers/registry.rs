//! Provider registry: registration, priority ordering and selection.

use super::error::ProviderError;
use super::traits::LookupProvider;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Provider id used in errors that are not tied to a single provider.
pub const REGISTRY_ID: &str = "registry";

/// How long the "configured" snapshot stays valid.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60);

/// Shared handle to a provider adapter.
pub type SharedProvider = Arc<dyn LookupProvider>;

/// A provider picked for a call, together with its registry id.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub id: String,
    pub provider: SharedProvider,
}

impl fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("id", &self.id)
            .field("name", &self.provider.provider_name())
            .finish()
    }
}

/// Status of one registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    /// Credentials are present.
    pub configured: bool,
    /// Position in the priority list, `None` when not listed.
    pub priority_rank: Option<usize>,
    pub supports_batch: bool,
    /// Automatic selection would currently pick this provider.
    pub active: bool,
}

#[derive(Default)]
struct RegistryState {
    /// Registration order is the fallback order.
    providers: Vec<(String, SharedProvider)>,
    priority: Vec<String>,
}

impl RegistryState {
    fn find(&self, id: &str) -> Option<&SharedProvider> {
        self.providers
            .iter()
            .find(|(pid, _)| pid == id)
            .map(|(_, p)| p)
    }
}

struct ConfiguredSnapshot {
    taken_at: Instant,
    configured: HashSet<String>,
}

/// Index of provider adapters.
///
/// The registry holds no results and no rate state; it only answers
/// "which adapter serves this call". Registration and priority changes are
/// expected at startup or on configuration changes and take a write lock;
/// selection only reads.
///
/// Whether a provider is configured is memoized for [`DEFAULT_SNAPSHOT_TTL`]
/// so that repeated selections do not re-check credentials on every call.
/// Any registration change drops the snapshot.
///
/// # Example
///
/// ```rust,ignore
/// use carrier_lookup::ProviderRegistry;
/// use std::sync::Arc;
///
/// let registry = ProviderRegistry::new();
/// registry.register("telnyx", Arc::new(telnyx_provider));
/// registry.register("twilio", Arc::new(twilio_provider));
/// registry.set_priority(["twilio", "telnyx"])?;
///
/// let resolved = registry.provider_for_call(None)?;
/// ```
pub struct ProviderRegistry {
    state: RwLock<RegistryState>,
    snapshot: Mutex<Option<ConfiguredSnapshot>>,
    snapshot_ttl: Duration,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        let ids: Vec<&str> = state.providers.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .field("priority", &state.priority)
            .field("snapshot_ttl", &self.snapshot_ttl)
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::with_snapshot_ttl(DEFAULT_SNAPSHOT_TTL)
    }

    /// Create a registry with a custom lifetime for the configured snapshot.
    ///
    /// `Duration::ZERO` disables memoization.
    pub fn with_snapshot_ttl(snapshot_ttl: Duration) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            snapshot: Mutex::new(None),
            snapshot_ttl,
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a provider under `id`, replacing any previous one.
    pub fn register(&self, id: impl Into<String>, provider: SharedProvider) {
        let id = id.into();
        {
            let mut state = self.write_state();
            if let Some(slot) = state.providers.iter_mut().find(|(pid, _)| *pid == id) {
                #[cfg(feature = "tracing")]
                warn!(provider = %id, "Provider already registered, replacing");
                slot.1 = provider;
            } else {
                state.providers.push((id.clone(), provider));
            }
        }
        self.invalidate();

        #[cfg(feature = "tracing")]
        info!(provider = %id, "Registered provider");
    }

    /// Remove a provider. It is also dropped from the priority list.
    ///
    /// Returns true when a provider was removed.
    pub fn deregister(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.write_state();
            let before = state.providers.len();
            state.providers.retain(|(pid, _)| pid != id);
            state.priority.retain(|pid| pid != id);
            state.providers.len() != before
        };
        if removed {
            self.invalidate();

            #[cfg(feature = "tracing")]
            info!(provider = %id, "Deregistered provider");
        }
        removed
    }

    /// Ids of all registered providers in registration order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.read_state()
            .providers
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<SharedProvider> {
        self.read_state().find(id).cloned()
    }

    /// Replace the priority order.
    ///
    /// Every id must be registered and appear once; otherwise the current
    /// order is kept and a configuration error is returned.
    pub fn set_priority<I, S>(&self, ids: I) -> Result<(), ProviderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        {
            let mut state = self.write_state();
            let mut seen = HashSet::new();
            for id in &ids {
                if state.find(id).is_none() {
                    return Err(ProviderError::configuration(
                        REGISTRY_ID,
                        format!("unknown provider '{}' in priority list", id),
                    ));
                }
                if !seen.insert(id.as_str()) {
                    return Err(ProviderError::configuration(
                        REGISTRY_ID,
                        format!("provider '{}' listed twice in priority list", id),
                    ));
                }
            }
            state.priority = ids;
        }

        #[cfg(feature = "tracing")]
        info!(priority = ?self.priority(), "Provider priority updated");

        Ok(())
    }

    pub fn priority(&self) -> Vec<String> {
        self.read_state().priority.clone()
    }

    /// Drop the memoized configured snapshot.
    ///
    /// Call this after credentials change to make the change visible
    /// before the snapshot expires on its own.
    pub fn invalidate(&self) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        *snapshot = None;
    }

    /// Ids of configured providers, from the snapshot when it is fresh.
    fn configured_ids(&self) -> HashSet<String> {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(snap) = snapshot.as_ref()
            && snap.taken_at.elapsed() < self.snapshot_ttl
        {
            return snap.configured.clone();
        }

        let configured: HashSet<String> = self
            .read_state()
            .providers
            .iter()
            .filter(|(_, p)| p.is_configured())
            .map(|(id, _)| id.clone())
            .collect();

        #[cfg(feature = "tracing")]
        debug!(configured = ?configured, "Recomputed configured providers");

        *snapshot = Some(ConfiguredSnapshot {
            taken_at: Instant::now(),
            configured: configured.clone(),
        });
        configured
    }

    /// Configured providers in registration order.
    pub fn configured_providers(&self) -> Vec<ResolvedProvider> {
        let configured = self.configured_ids();
        self.read_state()
            .providers
            .iter()
            .filter(|(id, _)| configured.contains(id))
            .map(|(id, p)| ResolvedProvider {
                id: id.clone(),
                provider: Arc::clone(p),
            })
            .collect()
    }

    /// Resolve the provider that should serve a call.
    ///
    /// With an explicit id, that provider is returned if it is configured.
    /// Otherwise the priority list is walked and the first configured
    /// provider wins. When nothing in the priority list is configured, any
    /// configured provider is used (logged at warn level). With nothing
    /// configured at all, a configuration error is returned.
    pub fn provider_for_call(&self, explicit: Option<&str>) -> Result<ResolvedProvider, ProviderError> {
        let configured = self.configured_ids();
        let state = self.read_state();

        if let Some(id) = explicit {
            let provider = state.find(id).ok_or_else(|| {
                ProviderError::configuration(id, format!("provider '{}' is not registered", id))
            })?;
            if !configured.contains(id) {
                return Err(ProviderError::configuration(
                    id,
                    format!("provider '{}' is not configured", id),
                ));
            }
            return Ok(ResolvedProvider {
                id: id.to_string(),
                provider: Arc::clone(provider),
            });
        }

        for id in &state.priority {
            if configured.contains(id)
                && let Some(provider) = state.find(id)
            {
                return Ok(ResolvedProvider {
                    id: id.clone(),
                    provider: Arc::clone(provider),
                });
            }
        }

        if let Some((id, provider)) = state.providers.iter().find(|(id, _)| configured.contains(id)) {
            #[cfg(feature = "tracing")]
            warn!(
                provider = %id,
                priority = ?state.priority,
                "No provider from the priority list is configured, falling back"
            );
            return Ok(ResolvedProvider {
                id: id.clone(),
                provider: Arc::clone(provider),
            });
        }

        Err(ProviderError::configuration(
            REGISTRY_ID,
            "no lookup provider is configured",
        ))
    }

    /// Describe every registered provider.
    pub fn status(&self) -> Vec<ProviderDescriptor> {
        let active = self.provider_for_call(None).ok().map(|r| r.id);
        let configured = self.configured_ids();
        let state = self.read_state();

        state
            .providers
            .iter()
            .map(|(id, provider)| ProviderDescriptor {
                id: id.clone(),
                display_name: provider.provider_name().to_string(),
                configured: configured.contains(id),
                priority_rank: state.priority.iter().position(|p| p == id),
                supports_batch: provider.supports_batch(),
                active: active.as_deref() == Some(id.as_str()),
            })
            .collect()
    }
}
