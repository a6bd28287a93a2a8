//! End-to-end settlement scenarios
//!
//! These tests drive the full engine through its public surface: policy
//! purchase, oracle writes, settlement, overrides and the event stream.

use std::sync::Arc;

use cropguard_common::{
    security::{AuditCategory, AuditLogger, MemoryAuditSink},
    AccessError, Clock, CropGuardError, ErrorKind, GeoKey, InMemoryLedger, Ledger, ManualClock,
    PolicyError, PolicyStatus, TriggerType, ValidationError, WeatherReading, SECS_PER_DAY,
};
use cropguard_engine::{DomainEvent, EngineConfig, SettlementEngine, SettlementResult};
use futures::future::join_all;
use rust_decimal_macros::dec;

const OWNER: &str = "did:key:cropguard-owner";
const BOT: &str = "did:key:weather-bot";
const FARMER: &str = "did:key:farmer";

struct Harness {
    engine: Arc<SettlementEngine>,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    audit: MemoryAuditSink,
}

fn harness_with(config: EngineConfig) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new(config.pool_holder.clone()));
    ledger.seed(FARMER, dec!(100)).unwrap();
    ledger.fund_pool(dec!(10_000)).unwrap();
    let clock = Arc::new(ManualClock::new(1_720_000_000));

    let audit = MemoryAuditSink::new();
    let mut logger = AuditLogger::silent();
    logger.add_sink(Box::new(audit.clone()));

    let engine = SettlementEngine::new(config, ledger.clone(), clock.clone(), Arc::new(logger))
        .unwrap();
    engine.access().authorize(OWNER, BOT).unwrap();

    Harness {
        engine: Arc::new(engine),
        ledger,
        clock,
        audit,
    }
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

fn nairobi() -> GeoKey {
    GeoKey::from_degrees(-1.0, 36.0).unwrap()
}

#[tokio::test]
async fn test_drought_settlement_end_to_end() {
    let h = harness();

    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    assert_eq!(h.ledger.balance_of(FARMER).await, dec!(30));

    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(25, 0, 2_400), BOT)
        .unwrap();

    let result = h.engine.request_settlement(id).await.unwrap();
    assert_eq!(
        result,
        SettlementResult::Paid {
            trigger: TriggerType::Drought,
            amount: dec!(1000)
        }
    );

    let policy = h.engine.registry().get(id).unwrap();
    assert_eq!(policy.status, PolicyStatus::Claimed);
    assert_eq!(policy.payout.unwrap().amount, dec!(1000));
    assert_eq!(h.ledger.balance_of(FARMER).await, dec!(1030));

    let err = h.engine.request_settlement(id).await.unwrap_err();
    assert_eq!(err, CropGuardError::Policy(PolicyError::AlreadyClaimed(id)));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
}

#[tokio::test]
async fn test_premium_floors_fractional_amounts() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "sorghum", dec!(999), 30 * SECS_PER_DAY, 0.0, 0.0)
        .await
        .unwrap();

    assert_eq!(h.engine.registry().get(id).unwrap().premium, dec!(69));
    assert_eq!(h.engine.registry().premium_for(dec!(1000)), dec!(70));
    assert_eq!(h.ledger.balance_of(FARMER).await, dec!(31));
}

#[tokio::test]
async fn test_geo_bounds() {
    let h = harness();

    let err = h
        .engine
        .create_policy(FARMER, "maize", dec!(100), 30 * SECS_PER_DAY, 90.0001, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CropGuardError::Validation(ValidationError::InvalidLocation { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(100), 30 * SECS_PER_DAY, 90.0, 180.0)
        .await
        .unwrap();
    let location = h.engine.registry().get(id).unwrap().location;
    assert_eq!((location.lat(), location.lon()), (900_000, 1_800_000));
}

#[tokio::test]
async fn test_nearby_locations_do_not_share_readings() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();

    // One scaled unit away is a different location
    h.engine
        .weather()
        .update(
            GeoKey::from_degrees(-1.0001, 36.0).unwrap(),
            WeatherReading::new(5, 0, 2_400),
            BOT,
        )
        .unwrap();

    let err = h.engine.request_settlement(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_pause_blocks_entry_points_but_not_reads_or_overrides() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();

    h.engine.admin().pause(OWNER).unwrap();

    assert_eq!(
        h.engine
            .create_policy(FARMER, "maize", dec!(100), 30 * SECS_PER_DAY, 0.0, 0.0)
            .await
            .unwrap_err(),
        CropGuardError::Access(AccessError::Paused)
    );
    assert_eq!(
        h.engine.request_settlement(id).await.unwrap_err(),
        CropGuardError::Access(AccessError::Paused)
    );
    assert_eq!(h.engine.registry().get(id).unwrap().status, PolicyStatus::Active);

    let result = h
        .engine
        .admin()
        .emergency_payout(OWNER, id, dec!(500), "hail storm")
        .await
        .unwrap();
    assert_eq!(result.amount(), dec!(500));
    assert!(h
        .audit
        .events()
        .iter()
        .any(|e| e.category == AuditCategory::AdminOverride && e.action == "emergency_payout"));
}

#[tokio::test]
async fn test_failed_payout_rolls_back_and_retry_pays_once() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(300, 150, 2_400), BOT)
        .unwrap();

    h.ledger.halt();
    let err = h.engine.request_settlement(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(h.engine.registry().get(id).unwrap().status, PolicyStatus::Active);

    h.ledger.resume();
    let result = h.engine.request_settlement(id).await.unwrap();
    assert_eq!(result.amount(), dec!(1000));
    assert!(h.engine.request_settlement(id).await.is_err());
    assert_eq!(h.ledger.balance_of(FARMER).await, dec!(1030));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_double_payout_under_contention() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(10, 0, 2_400), BOT)
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.request_settlement(id).await
            } else {
                engine
                    .admin()
                    .emergency_payout(OWNER, id, dec!(1000), "manual")
                    .await
            }
        }));
    }

    let results = join_all(tasks).await;
    let paid = results
        .into_iter()
        .filter_map(|r| r.ok())
        .filter(|r| matches!(r, Ok(SettlementResult::Paid { .. })))
        .count();

    assert_eq!(paid, 1);
    assert_eq!(h.ledger.balance_of(FARMER).await, dec!(1030));
}

#[tokio::test]
async fn test_oracle_callback_flow() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();

    let request_id = h.engine.oracle().request_weather(id).unwrap();
    assert_eq!(h.engine.oracle().pending()[0].location, nairobi());

    let result = h
        .engine
        .oracle()
        .fulfill(BOT, request_id, WeatherReading::new(300, 20, 4_000))
        .await
        .unwrap();
    assert_eq!(
        result,
        Some(SettlementResult::Paid {
            trigger: TriggerType::Heatwave,
            amount: dec!(750)
        })
    );
    assert!(h.engine.weather().is_fresh(&nairobi(), 0));

    assert_eq!(
        h.engine
            .oracle()
            .fulfill(BOT, uuid::Uuid::now_v7(), WeatherReading::new(1, 0, 0))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_stale_data_rejected_when_age_limit_configured() {
    let mut config = EngineConfig::default();
    config.settlement.max_data_age_secs = Some(3_600);
    let h = harness_with(config);

    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(10, 0, 2_400), BOT)
        .unwrap();

    h.clock.advance(3_601);
    let err = h.engine.request_settlement(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Consistency);

    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(10, 0, 2_400), BOT)
        .unwrap();
    assert!(h.engine.request_settlement(id).await.unwrap().is_paid());
}

#[tokio::test]
async fn test_event_stream_records_lifecycle() {
    let h = harness();
    let mut rx = h.engine.subscribe();

    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 30 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(25, 0, 2_400), BOT)
        .unwrap();
    h.engine.request_settlement(id).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
        if let DomainEvent::PolicySettled { policy_id, payout, .. } = event {
            assert_eq!(policy_id, id);
            assert_eq!(payout, dec!(1000));
        }
    }
    assert_eq!(
        names,
        vec!["policy_created", "weather_updated", "policy_settled"]
    );
}

#[tokio::test]
async fn test_expired_policy_cannot_settle() {
    let h = harness();
    let id = h
        .engine
        .create_policy(FARMER, "maize", dec!(1000), 7 * SECS_PER_DAY, -1.0, 36.0)
        .await
        .unwrap();
    h.clock.advance(7 * SECS_PER_DAY as i64 + 1);
    h.engine
        .weather()
        .update(nairobi(), WeatherReading::new(10, 0, 2_400), BOT)
        .unwrap();

    assert!(matches!(
        h.engine.request_settlement(id).await,
        Err(CropGuardError::Policy(PolicyError::Expired { .. }))
    ));
    let policy = h.engine.registry().get(id).unwrap();
    assert_eq!(policy.status_at(h.clock.now()), PolicyStatus::Expired);
}
