//! End-to-end tests of the lookup service against in-process providers.

mod common;

use carrier_lookup::{
    BatchOptions, CancellationToken, LookupErrorKind, LookupOptions, LookupService,
    LookupServiceError, PhoneLookup, ProviderErrorKind, RateLimit, RetryConfig, SharedProvider,
    SqliteCacheStore,
};
use common::{FakeProvider, network, not_found, rate_limited, service};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn defaults() -> LookupOptions {
    LookupOptions::default()
}

// =============================================================================
// Cache path
// =============================================================================

#[tokio::test]
async fn test_second_format_is_served_from_cache() {
    let telnyx = FakeProvider::new("telnyx").shared();
    let service = service(&[("telnyx", &telnyx)]);

    let first = service.lookup("(617) 555-0100", &defaults()).await.unwrap();
    assert_eq!(first.phone_number().as_str(), "6175550100");
    assert_eq!(first.provider_id(), "telnyx");
    assert_eq!(telnyx.calls(), 1);
    assert_eq!(telnyx.seen(), vec!["6175550100"]);

    let second = service.lookup("617-555-0100", &defaults()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(telnyx.calls(), 1);

    let stats = service.cache_stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.valid, 1);
}

#[tokio::test]
async fn test_cache_hit_needs_no_provider() {
    let telnyx = FakeProvider::new("telnyx").shared();
    let service = service(&[("telnyx", &telnyx)]);
    service.lookup("6175550100", &defaults()).await.unwrap();

    telnyx.set_configured(false);
    service.registry().invalidate();

    let cached = service.lookup("+1 617 555 0100", &defaults()).await;
    assert!(cached.is_ok());
    assert_eq!(telnyx.calls(), 1);
}

#[tokio::test]
async fn test_without_cache_always_calls_and_never_writes() {
    let telnyx = FakeProvider::new("telnyx").shared();
    let service = service(&[("telnyx", &telnyx)]);
    let options = defaults().without_cache();

    service.lookup("6175550100", &options).await.unwrap();
    service.lookup("6175550100", &options).await.unwrap();

    assert_eq!(telnyx.calls(), 2);
    assert_eq!(service.cache_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_cache_management_operations() {
    let telnyx = FakeProvider::new("telnyx").shared();
    let service = service(&[("telnyx", &telnyx)]);
    service.lookup("2125550001", &defaults()).await.unwrap();
    service.lookup("2125550002", &defaults()).await.unwrap();

    let recent = service.recent_lookups(1).await.unwrap();
    assert_eq!(recent.len(), 1);

    assert_eq!(service.clear_expired_cache().await.unwrap(), 0);

    service.set_cache_ttl(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(service.cache_stats().await.unwrap().expired, 2);
    assert_eq!(service.clear_expired_cache().await.unwrap(), 2);

    service.set_cache_ttl(Duration::from_secs(60));
    service.lookup("2125550003", &defaults()).await.unwrap();
    assert_eq!(service.clear_cache().await.unwrap(), 1);
}

#[tokio::test]
async fn test_sqlite_backed_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lookup_cache.db");
    let telnyx = FakeProvider::new("telnyx").shared();

    {
        let store = SqliteCacheStore::open(&path).await.unwrap();
        let service = LookupService::builder()
            .cache_store(Arc::new(store))
            .provider("telnyx", telnyx.clone() as SharedProvider)
            .build()
            .unwrap();
        service.lookup("(617) 555-0100", &defaults()).await.unwrap();
    }

    let store = SqliteCacheStore::open(&path).await.unwrap();
    let service = LookupService::builder()
        .cache_store(Arc::new(store))
        .provider("telnyx", telnyx.clone() as SharedProvider)
        .build()
        .unwrap();
    let cached = service.lookup("617.555.0100", &defaults()).await.unwrap();

    assert_eq!(cached.carrier_name(), Some("telnyx carrier"));
    assert_eq!(telnyx.calls(), 1);
}

// =============================================================================
// Validation and selection
// =============================================================================

#[tokio::test]
async fn test_invalid_number_contacts_no_provider() {
    let telnyx = FakeProvider::new("telnyx").shared();
    let service = service(&[("telnyx", &telnyx)]);

    for raw in ["", "555-0100", "(617) 555-01OO", "+44 20 7946 0958"] {
        let err = service.lookup(raw, &defaults()).await.unwrap_err();
        assert_eq!(err.kind(), LookupErrorKind::Validation, "input {:?}", raw);
    }
    assert_eq!(telnyx.calls(), 0);
}

#[tokio::test]
async fn test_priority_and_fallback() {
    let a = FakeProvider::new("a").shared();
    let b = FakeProvider::new("b").shared();
    let service = service(&[("b", &b), ("a", &a)]);

    let opts = defaults().without_cache();
    assert_eq!(service.lookup("6175550100", &opts).await.unwrap().provider_id(), "b");

    b.set_configured(false);
    service.registry().invalidate();
    assert_eq!(service.lookup("6175550100", &opts).await.unwrap().provider_id(), "a");

    b.set_configured(true);
    service.registry().invalidate();
    assert!(service.deregister_provider("b"));
    assert_eq!(service.lookup("6175550100", &opts).await.unwrap().provider_id(), "a");
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn test_fallback_outside_priority_list() {
    let a = FakeProvider::new("a").shared();
    let service = LookupService::builder()
        .provider_priority(["missing"])
        .provider("a", a.clone() as SharedProvider)
        .build()
        .unwrap();

    assert!(service.registry().priority().is_empty());
    let result = service.lookup("6175550100", &defaults()).await.unwrap();
    assert_eq!(result.provider_id(), "a");
}

#[tokio::test]
async fn test_explicit_provider() {
    let a = FakeProvider::new("a").shared();
    let b = FakeProvider::new("b").unconfigured().shared();
    let service = service(&[("a", &a), ("b", &b)]);

    let err = service
        .lookup("6175550100", &defaults().with_provider("b"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::Configuration);
    assert_eq!(b.calls(), 0);

    let err = service
        .lookup("6175550100", &defaults().with_provider("nope"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::Configuration);

    let result = service
        .lookup("6175550100", &defaults().with_provider("a"))
        .await
        .unwrap();
    assert_eq!(result.provider_id(), "a");
}

#[tokio::test]
async fn test_nothing_configured() {
    let a = FakeProvider::new("a").unconfigured().shared();
    let service = service(&[("a", &a)]);

    let err = service.lookup("6175550100", &defaults()).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::Configuration);
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn test_priority_management_and_status() {
    let a = FakeProvider::new("a").shared();
    let b = FakeProvider::new("b").unconfigured().shared();
    let service = service(&[("a", &a), ("b", &b)]);

    let err = service.set_provider_priority(["b", "ghost"]).unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::Configuration);
    assert_eq!(service.registry().priority(), vec!["a", "b"]);

    service.set_provider_priority(["b", "a"]).unwrap();
    let status = service.provider_status();
    assert_eq!(status.len(), 2);

    let a_status = status.iter().find(|p| p.id == "a").unwrap();
    assert!(a_status.configured);
    assert!(a_status.active);
    assert_eq!(a_status.priority_rank, Some(1));

    let b_status = status.iter().find(|p| p.id == "b").unwrap();
    assert!(!b_status.configured);
    assert!(!b_status.active);
    assert_eq!(b_status.priority_rank, Some(0));
}

// =============================================================================
// Retry policy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retries_only_transient_errors() {
    let cases = [
        (network("p"), 3, ProviderErrorKind::Network),
        (rate_limited("p", None), 3, ProviderErrorKind::RateLimit),
        (not_found("p"), 1, ProviderErrorKind::Lookup),
        (
            Some(carrier_lookup::ProviderError::authentication("p", "bad key")),
            1,
            ProviderErrorKind::Authentication,
        ),
        (
            Some(carrier_lookup::ProviderError::configuration("p", "no key")),
            1,
            ProviderErrorKind::Configuration,
        ),
    ];

    for (failure, expected_calls, expected_kind) in cases {
        let p = FakeProvider::new("p")
            .script(vec![failure.clone(), failure.clone(), failure.clone(), failure])
            .shared();
        let service = service(&[("p", &p)]);

        let err = service.lookup("6175550100", &defaults()).await.unwrap_err();
        assert_eq!(p.calls(), expected_calls, "{:?}", expected_kind);
        assert_eq!(
            err.provider_error().map(|e| e.kind()),
            Some(expected_kind)
        );
        assert_eq!(service.cache_stats().await.unwrap().total, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_and_caches() {
    let p = FakeProvider::new("p")
        .script(vec![network("p"), rate_limited("p", None)])
        .shared();
    let service = service(&[("p", &p)]);

    let start = Instant::now();
    let result = service.lookup("6175550100", &defaults()).await.unwrap();
    assert_eq!(result.provider_id(), "p");
    assert_eq!(p.calls(), 3);
    // 1s then 2s of exponential backoff
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(service.cache_stats().await.unwrap().total, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_extends_backoff() {
    let p = FakeProvider::new("p")
        .script(vec![rate_limited("p", Some(Duration::from_secs(7)))])
        .shared();
    let service = service(&[("p", &p)]);

    let start = Instant::now();
    service.lookup("6175550100", &defaults()).await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(7), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(8), "elapsed {:?}", elapsed);
    assert_eq!(p.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_is_capped() {
    let p = FakeProvider::new("p")
        .script(vec![rate_limited("p", Some(Duration::from_secs(1_000_000_000)))])
        .shared();
    let service = LookupService::builder()
        .default_rate_limit(RateLimit::new(1000.0, 100))
        .retry(RetryConfig::default().with_max_retry_after(Duration::from_secs(90)))
        .provider("p", p.clone() as SharedProvider)
        .build()
        .unwrap();

    let start = Instant::now();
    service.lookup("6175550100", &defaults()).await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(90), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(91), "elapsed {:?}", elapsed);
    assert_eq!(p.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_attempts_are_configurable() {
    let p = FakeProvider::new("p")
        .script(vec![network("p"); 10])
        .shared();
    let service = LookupService::builder()
        .default_rate_limit(RateLimit::new(1000.0, 100))
        .retry(RetryConfig::default().with_max_attempts(5))
        .provider("p", p.clone() as SharedProvider)
        .build()
        .unwrap();

    service.lookup("6175550100", &defaults()).await.unwrap_err();
    assert_eq!(p.calls(), 5);
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_provider_rate_limit_spaces_calls() {
    let p = FakeProvider::new("p").shared();
    let service = LookupService::builder()
        .provider_rate_limit("p", RateLimit::new(2.0, 2))
        .provider("p", p.clone() as SharedProvider)
        .build()
        .unwrap();

    let start = Instant::now();
    for n in 0..6 {
        let number = format!("212555{:04}", n);
        service.lookup(&number, &defaults()).await.unwrap();
    }
    // (6 - 2) / 2 = 2s
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2100), "elapsed {:?}", elapsed);
}

// =============================================================================
// Batch
// =============================================================================

#[tokio::test]
async fn test_batch_failure_does_not_abort_rest() {
    let p = FakeProvider::new("p")
        .script(vec![None, None, not_found("p"), None, None])
        .shared();
    let service = service(&[("p", &p)]);

    let numbers = [
        "2125550001",
        "2125550002",
        "2125550003",
        "2125550004",
        "2125550005",
    ];
    let items = service.batch_lookup(&numbers, &BatchOptions::default()).await;

    assert_eq!(items.len(), 5);
    assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 4);
    assert_eq!(
        items[2].error().map(LookupServiceError::kind),
        Some(LookupErrorKind::Lookup)
    );
    assert!(items[3].is_ok());
    assert!(items[4].is_ok());
    assert_eq!(p.calls(), 5);
    assert_eq!(p.seen(), numbers.to_vec());
}

#[tokio::test]
async fn test_batch_dedupes_and_maps_back() {
    let p = FakeProvider::new("p").shared();
    let service = service(&[("p", &p)]);

    let numbers = vec![
        "(617) 555-0100".to_string(),
        "not a number".to_string(),
        "617.555.0100".to_string(),
        "+1 212 555 0199".to_string(),
    ];
    let items = service.batch_lookup(&numbers, &BatchOptions::default()).await;

    assert_eq!(items.len(), 4);
    assert_eq!(items[0].input, "(617) 555-0100");
    assert_eq!(items[1].error().map(|e| e.kind()), Some(LookupErrorKind::Validation));
    assert_eq!(items[0].result(), items[2].result());
    assert_eq!(
        items[3].result().map(|r| r.phone_number().as_str()),
        Some("2125550199")
    );
    assert_eq!(p.calls(), 2);
}

#[tokio::test]
async fn test_batch_concurrency_keeps_input_order() {
    let p = FakeProvider::new("p").delay(Duration::from_millis(5)).shared();
    let service = service(&[("p", &p)]);

    let numbers: Vec<String> = (0..8).map(|n| format!("212555{:04}", n)).collect();
    let items = service
        .batch_lookup(&numbers, &BatchOptions::default().with_concurrency(4))
        .await;

    let looked_up: Vec<&str> = items
        .iter()
        .map(|i| i.result().unwrap().phone_number().as_str())
        .collect();
    assert_eq!(looked_up, numbers.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_batch_rate_limit_paces_only_provider_calls() {
    let p = FakeProvider::new("p").shared();
    let service = service(&[("p", &p)]);

    // Warm the cache for two numbers.
    service.lookup("2125550001", &defaults()).await.unwrap();
    service.lookup("2125550002", &defaults()).await.unwrap();

    let numbers = ["2125550001", "2125550002", "2125550003", "2125550004", "2125550005"];
    let start = Instant::now();
    let items = service
        .batch_lookup(&numbers, &BatchOptions::default().with_rate_limit(1.0))
        .await;

    assert!(items.iter().all(|i| i.is_ok()));
    assert_eq!(p.calls(), 5);
    // Three provider calls at 1/s: the first is immediate.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2100), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_batch_with_vanishing_rate_limit_can_be_cancelled() {
    let p = FakeProvider::new("p").shared();
    let service = service(&[("p", &p)]);
    let token = CancellationToken::new();

    let options = BatchOptions::default()
        .with_rate_limit(1e-30)
        .with_cancel(token.clone());
    let (items, _) = tokio::join!(
        service.batch_lookup(&["2125550001", "2125550002"], &options),
        async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        }
    );

    assert!(items[0].is_ok());
    assert_eq!(items[1].error(), Some(&LookupServiceError::Cancelled));
    assert_eq!(p.calls(), 1);
}

// =============================================================================
// Concurrency and cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_same_key_lookups_coalesce() {
    let p = FakeProvider::new("p").delay(Duration::from_secs(1)).shared();
    let service = service(&[("p", &p)]);

    let options = defaults();
    let (first, second) = tokio::join!(
        service.lookup("(617) 555-0100", &options),
        service.lookup("617-555-0100", &options),
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(p.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let p = FakeProvider::new("p").shared();
    let service = service(&[("p", &p)]);

    let token = CancellationToken::new();
    token.cancel();

    let err = service
        .lookup("6175550100", &defaults().with_cancel(token.clone()))
        .await
        .unwrap_err();
    assert_eq!(err, LookupServiceError::Cancelled);

    let items = service
        .batch_lookup(&["6175550100", "2125550199"], &BatchOptions::default().with_cancel(token))
        .await;
    assert!(items.iter().all(|i| i.error() == Some(&LookupServiceError::Cancelled)));
    assert_eq!(p.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_in_flight_does_not_write_cache() {
    let p = FakeProvider::new("p").delay(Duration::from_secs(10)).shared();
    let service = service(&[("p", &p)]);
    let token = CancellationToken::new();

    let options = defaults().with_cancel(token.clone());
    let (outcome, _) = tokio::join!(service.lookup("6175550100", &options), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    assert_eq!(outcome.unwrap_err(), LookupServiceError::Cancelled);
    assert_eq!(p.calls(), 1);
    assert_eq!(service.cache_stats().await.unwrap().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let p = FakeProvider::new("p").script(vec![network("p"); 3]).shared();
    let service = service(&[("p", &p)]);
    let token = CancellationToken::new();

    let options = defaults().with_cancel(token.clone());
    let start = Instant::now();
    let (outcome, _) = tokio::join!(service.lookup("6175550100", &options), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();
    });

    assert_eq!(outcome.unwrap_err(), LookupServiceError::Cancelled);
    assert_eq!(p.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}
