//! Event recording and deferred geography enrichment tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use qrlinker::analytics::{
    EnrichmentQueue, EventRecorder, RequestContext, ScanLogPayload, SocialClickPayload,
    enrich_event,
};
use qrlinker::errors::QrLinkerError;
use qrlinker::services::{GeoInfo, GeoIpProvider};
use qrlinker::storage::{EventRef, SeaOrmStorage};

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

fn recorder_with(
    storage: &Arc<SeaOrmStorage>,
    lookup: Arc<dyn qrlinker::services::GeoIpLookup>,
    timeout: Duration,
) -> EventRecorder {
    let queue = EnrichmentQueue::start(
        storage.clone(),
        GeoIpProvider::from_lookup(lookup),
        timeout,
    );
    EventRecorder::new(storage.clone(), Some(queue))
}

fn scan_payload(qr_code_id: i64, session: &str) -> ScanLogPayload {
    ScanLogPayload {
        qr_code_id: Some(qr_code_id),
        user_agent: Some(IPHONE_UA.to_string()),
        session_id: Some(session.to_string()),
    }
}

fn public_client() -> RequestContext {
    RequestContext {
        client_ip: Some("8.8.8.8".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_geography_transitions_from_null_to_resolved() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("GEO1", "https://example.com", true, None)
        .await
        .unwrap();
    let lookup = Arc::new(common::FixedLookup::with_delay(
        common::munich(),
        Duration::from_millis(300),
    ));
    let recorder = recorder_with(&storage, lookup.clone(), Duration::from_secs(5));

    let recorded = recorder
        .record_scan(scan_payload(qr.id, "geo-session"), public_client())
        .await
        .unwrap();
    assert!(recorded.is_new_user);

    let row = storage.get_scan(recorded.scan_id).await.unwrap().unwrap();
    assert_eq!(row.country, None);
    assert_eq!(row.city, None);
    assert_eq!(row.region, None);
    assert_eq!(row.device_type, "mobile");
    assert_eq!(row.ip_address.as_deref(), Some("8.8.8.8"));

    let scan_id = recorded.scan_id;
    let resolved = common::wait_until(Duration::from_secs(5), || {
        let storage = storage.clone();
        async move {
            storage
                .get_scan(scan_id)
                .await
                .ok()
                .flatten()
                .is_some_and(|row| row.country.is_some())
        }
    })
    .await;
    assert!(resolved, "geography was never written");

    let row = storage.get_scan(scan_id).await.unwrap().unwrap();
    assert_eq!(row.country.as_deref(), Some("Germany"));
    assert_eq!(row.city.as_deref(), Some("Munich"));
    assert_eq!(row.region.as_deref(), Some("Bavaria"));
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_recording_returns_when_resolver_hangs() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("HANG", "https://example.com", true, None)
        .await
        .unwrap();
    let recorder = recorder_with(
        &storage,
        Arc::new(common::HangingLookup),
        Duration::from_secs(3600),
    );

    let recorded = tokio::time::timeout(
        Duration::from_secs(5),
        recorder.record_scan(scan_payload(qr.id, "hang-session"), public_client()),
    )
    .await
    .expect("recording blocked on the resolver")
    .unwrap();

    let row = storage.get_scan(recorded.scan_id).await.unwrap().unwrap();
    assert!(row.country.is_none());
}

#[tokio::test]
async fn test_failing_resolver_leaves_geography_null() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("FAIL", "https://example.com", true, None)
        .await
        .unwrap();
    let recorder = recorder_with(
        &storage,
        Arc::new(common::FailingLookup),
        Duration::from_secs(1),
    );

    let recorded = recorder
        .record_scan(scan_payload(qr.id, "fail-session"), public_client())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let row = storage.get_scan(recorded.scan_id).await.unwrap().unwrap();
    assert!(row.country.is_none() && row.city.is_none() && row.region.is_none());
}

#[tokio::test]
async fn test_private_address_is_not_enriched() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("PRIV", "https://example.com", true, None)
        .await
        .unwrap();
    let lookup = Arc::new(common::FixedLookup::new(common::munich()));
    let recorder = recorder_with(&storage, lookup.clone(), Duration::from_secs(1));

    let ctx = RequestContext {
        client_ip: Some("192.168.1.20".to_string()),
        ..Default::default()
    };
    recorder
        .record_scan(scan_payload(qr.id, "private-session"), ctx)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_enriching_missing_event_is_noop() {
    let (_dir, storage) = common::setup_storage().await;
    let lookup = Arc::new(common::FixedLookup::new(common::munich()));
    let provider = GeoIpProvider::from_lookup(lookup.clone());

    enrich_event(
        &storage,
        &provider,
        EventRef::Scan(424242),
        "8.8.8.8",
        Duration::from_secs(1),
    )
    .await;
    enrich_event(
        &storage,
        &provider,
        EventRef::SocialClick(424242),
        "8.8.8.8",
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(lookup.calls(), 2);
    assert!(storage.get_scan(424242).await.unwrap().is_none());
    assert!(
        !storage
            .apply_geography(EventRef::Scan(424242), &GeoInfo::default())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_scan_for_unknown_qr_code_is_rejected_without_first_seen() {
    let (_dir, storage) = common::setup_storage().await;
    let recorder = EventRecorder::new(storage.clone(), None);

    let err = recorder
        .record_scan(scan_payload(999, "orphan-session"), RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QrLinkerError::Validation(_)));

    let err = recorder
        .record_scan(ScanLogPayload::default(), RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QrLinkerError::Validation(_)));

    assert!(storage.get_first_seen("orphan-session").await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_priority_and_fallback() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("PRIO", "https://example.com", true, None)
        .await
        .unwrap();
    let recorder = EventRecorder::new(storage.clone(), None);

    // 请求体优先于 Cookie
    let ctx = RequestContext {
        cookie_session: Some("cookie-session".to_string()),
        ..Default::default()
    };
    let recorded = recorder
        .record_scan(scan_payload(qr.id, "payload-session"), ctx.clone())
        .await
        .unwrap();
    let row = storage.get_scan(recorded.scan_id).await.unwrap().unwrap();
    assert_eq!(row.session_id, "payload-session");

    // 请求体为空时使用 Cookie
    let payload = ScanLogPayload {
        qr_code_id: Some(qr.id),
        ..Default::default()
    };
    let recorded = recorder.record_scan(payload.clone(), ctx).await.unwrap();
    let row = storage.get_scan(recorded.scan_id).await.unwrap().unwrap();
    assert_eq!(row.session_id, "cookie-session");
    assert!(recorded.is_new_user);

    // 都没有时生成新的 id，每次都是新用户
    let first = recorder
        .record_scan(payload.clone(), RequestContext::default())
        .await
        .unwrap();
    let second = recorder
        .record_scan(payload, RequestContext::default())
        .await
        .unwrap();
    assert!(first.is_new_user && second.is_new_user);
}

#[tokio::test]
async fn test_only_first_event_is_marked_new() {
    let (_dir, storage) = common::setup_storage().await;
    let qr = storage
        .create_qr_code("ONCE", "https://example.com", true, Some(3))
        .await
        .unwrap();
    let recorder = EventRecorder::new(storage.clone(), None);

    let scan = recorder
        .record_scan(scan_payload(qr.id, "repeat"), RequestContext::default())
        .await
        .unwrap();
    let click = recorder
        .record_social_click(
            SocialClickPayload {
                platform: Some("instagram".to_string()),
                branch_code: Some("ONCE".to_string()),
                session_id: Some("repeat".to_string()),
            },
            RequestContext::default(),
        )
        .await
        .unwrap();

    assert!(scan.is_new_user);
    assert!(!click.is_new_user);

    let row = storage.get_social_click(click.click_id).await.unwrap().unwrap();
    assert_eq!(row.branch_id, Some(3));
    assert!(!row.is_new_user);
}

#[tokio::test]
async fn test_social_click_defaults() {
    let (_dir, storage) = common::setup_storage().await;
    let recorder = EventRecorder::new(storage.clone(), None);

    let click = recorder
        .record_social_click(
            SocialClickPayload {
                branch_code: Some("NO-SUCH-CODE".to_string()),
                ..Default::default()
            },
            RequestContext {
                user_agent: Some(IPHONE_UA.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let row = storage.get_social_click(click.click_id).await.unwrap().unwrap();
    assert_eq!(row.platform, "unknown");
    assert_eq!(row.branch_id, None);
    assert_eq!(row.device_type, "mobile");
    assert_eq!(row.user_agent.as_deref(), Some(IPHONE_UA));
}
