//! Scriptable in-process provider for service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use carrier_lookup::{
    LineType, LookupProvider, LookupResult, LookupService, PhoneNumber, ProviderError, RateLimit,
    SharedProvider,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider that answers from a script and counts its calls.
///
/// Each call pops the next scripted failure; an empty script or a `None`
/// entry means success.
pub struct FakeProvider {
    id: String,
    configured: AtomicBool,
    calls: AtomicUsize,
    script: Mutex<VecDeque<Option<ProviderError>>>,
    delay: Option<Duration>,
    seen: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            configured: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, outcomes: Vec<Option<ProviderError>>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn unconfigured(self) -> Self {
        self.configured.store(false, Ordering::SeqCst);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Numbers passed to `lookup`, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LookupProvider for FakeProvider {
    async fn lookup(&self, number: &PhoneNumber) -> Result<LookupResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(number.as_str().to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front().flatten();
        match next {
            Some(err) => Err(err),
            None => Ok(LookupResult::builder(number.clone(), self.id.as_str())
                .carrier_name(format!("{} carrier", self.id))
                .carrier_type(LineType::Mobile)
                .portable(Some(true))
                .ported(Some(false))
                .build()),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    fn provider_name(&self) -> &str {
        &self.id
    }
}

pub fn network(provider: &str) -> Option<ProviderError> {
    Some(ProviderError::network(provider, "connection reset"))
}

pub fn rate_limited(provider: &str, retry_after: Option<Duration>) -> Option<ProviderError> {
    Some(ProviderError::rate_limited(provider, "too many requests", retry_after))
}

pub fn not_found(provider: &str) -> Option<ProviderError> {
    Some(ProviderError::lookup(provider, "number not found", Some(404)))
}

/// Service over the given fakes with a permissive rate limit. Priority
/// follows the slice order.
pub fn service(providers: &[(&str, &Arc<FakeProvider>)]) -> LookupService {
    let mut builder = LookupService::builder()
        .default_rate_limit(RateLimit::new(1000.0, 100))
        .provider_priority(providers.iter().map(|(id, _)| id.to_string()));
    for (id, provider) in providers {
        let shared: SharedProvider = Arc::clone(provider) as SharedProvider;
        builder = builder.provider(*id, shared);
    }
    builder.build().unwrap()
}
