//! Multi-tick scenarios through the public control-loop API.

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use helm::engine::scheduler::TokioScheduler;
use helm::engine::{ControlLoop, LoopSettings};
use helm::strategy::RiskConfig;
use helm::types::*;

use crate::mock_venue::{candidate, Feed, ManualScheduler, MockVenue};

fn settings() -> LoopSettings {
    LoopSettings {
        tick_interval: Duration::from_secs(10),
        execution_timeout: Duration::from_secs(5),
    }
}

fn control_with(venue: &Arc<MockVenue>, scheduler: Arc<dyn helm::engine::scheduler::Scheduler>) -> ControlLoop {
    ControlLoop::new(
        venue.clone(),
        venue.clone(),
        RiskConfig::default(),
        scheduler,
        settings(),
    )
    .unwrap()
}

fn control(venue: &Arc<MockVenue>) -> ControlLoop {
    control_with(venue, Arc::new(TokioScheduler))
}

#[tokio::test]
async fn test_capital_tracks_venue_across_ticks() {
    let venue = MockVenue::new(dec!(100));
    venue.push_feed(Feed::Candidates(vec![candidate(
        "MON/USDC",
        Direction::Long,
        dec!(0.10),
        dec!(0.65),
    )]));
    venue.push_feed(Feed::Candidates(vec![]));
    venue.push_feed(Feed::Candidates(vec![candidate(
        "WETH/USDC",
        Direction::Short,
        dec!(0.10),
        dec!(0.65),
    )]));

    let control = control(&venue);
    for _ in 0..3 {
        control.tick().await.unwrap();
    }

    // 10% of 100, then 10% of the 90 the venue reports next
    let fills = venue.fills();
    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].size, dec!(10));
    assert_eq!(fills[1].size, dec!(9));
    assert_eq!(fills[1].direction, Direction::Short);
    assert_eq!(venue.balance(), dec!(81));

    let status = control.status().await;
    assert_eq!(status.address.as_deref(), Some("0xmock"));
    assert_eq!(status.balance, dec!(81));
    assert_eq!(status.tick_count, 3);
    assert_eq!(status.total_trades, 2);
    assert_eq!(status.positions, 2);
    assert!(status.last_scan.is_some());

    let trades = control.handle().trades().await;
    assert_eq!(trades[0].reference, "mock-1");
    assert_eq!(trades[1].reference, "mock-2");
    assert_eq!(trades[1].instrument, "WETH/USDC");
}

#[tokio::test]
async fn test_mixed_tick_records_only_successes() {
    let venue = MockVenue::new(dec!(1000));
    venue.reject("REJECTED");
    venue.push_feed(Feed::Candidates(vec![
        candidate("THIN", Direction::Long, dec!(0.03), dec!(0.90)),
        candidate("UNLIKELY", Direction::Long, dec!(0.05), dec!(0.20)),
        candidate("REJECTED", Direction::Long, dec!(0.10), dec!(0.65)),
        candidate("BOUNDARY", Direction::Long, dec!(0.05), dec!(0.30)),
        candidate("STRONG", Direction::Short, dec!(0.10), dec!(0.65)),
    ]));

    let control = control(&venue);
    let report = control.tick().await.unwrap();

    assert_eq!(report.scanned, 5);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.executed, 2);
    // 1% of 1000, then 10% of the remaining 990
    assert_eq!(report.committed, dec!(10) + dec!(99));

    let names: Vec<_> = control
        .handle()
        .trades()
        .await
        .into_iter()
        .map(|t| t.instrument)
        .collect();
    assert_eq!(names, ["BOUNDARY", "STRONG"]);
}

#[tokio::test]
async fn test_same_instrument_counts_one_position() {
    let venue = MockVenue::new(dec!(100));
    venue.push_feed(Feed::Candidates(vec![
        candidate("MON/USDC", Direction::Long, dec!(0.10), dec!(0.65)),
        candidate("MON/USDC", Direction::Long, dec!(0.10), dec!(0.65)),
    ]));

    let control = control(&venue);
    control.tick().await.unwrap();

    let status = control.status().await;
    assert_eq!(status.total_trades, 2);
    assert_eq!(status.positions, 1);
}

#[tokio::test]
async fn test_balance_outage_then_recovery() {
    let venue = MockVenue::new(dec!(100));
    venue.fail_balance("node unreachable");
    venue.push_feed(Feed::Candidates(vec![candidate(
        "MON/USDC",
        Direction::Long,
        dec!(0.10),
        dec!(0.65),
    )]));
    venue.push_feed(Feed::Candidates(vec![candidate(
        "MON/USDC",
        Direction::Long,
        dec!(0.10),
        dec!(0.65),
    )]));

    let control = control(&venue);
    let err = control.tick().await.unwrap_err();
    assert!(matches!(err, AgentError::Ledger(_)));
    assert!(venue.fills().is_empty());

    venue.restore_balance();
    let report = control.tick().await.unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(control.handle().trade_count().await, 1);
}

#[tokio::test]
async fn test_run_rides_through_scan_failures() {
    let venue = MockVenue::new(dec!(100));
    venue.push_feed(Feed::Fail("rate limited"));
    venue.push_feed(Feed::Candidates(vec![candidate(
        "MON/USDC",
        Direction::Long,
        dec!(0.10),
        dec!(0.65),
    )]));
    venue.push_feed(Feed::Fail("rate limited"));

    let scheduler = ManualScheduler::new(3);
    let control = control_with(&venue, scheduler.clone());
    scheduler.attach(control.handle());

    control.start();
    control.run().await;

    assert_eq!(venue.scans(), 3);
    assert_eq!(scheduler.intervals(), vec![Duration::from_secs(10); 3]);

    let status = control.status().await;
    assert!(!status.running);
    assert_eq!(status.failed_ticks, 2);
    assert_eq!(status.tick_count, 1);
    assert_eq!(status.total_trades, 1);
}

#[tokio::test]
async fn test_restart_keeps_ledger() {
    let venue = MockVenue::new(dec!(100));
    for _ in 0..2 {
        venue.push_feed(Feed::Candidates(vec![candidate(
            "MON/USDC",
            Direction::Long,
            dec!(0.10),
            dec!(0.65),
        )]));
    }

    let scheduler = ManualScheduler::new(1);
    let control = control_with(&venue, scheduler.clone());
    scheduler.attach(control.handle());

    control.start();
    control.run().await;
    assert_eq!(control.handle().trade_count().await, 1);

    // Stop is sticky until an explicit start.
    control.run().await;
    assert_eq!(venue.scans(), 1);

    control.start();
    control.run().await;

    let status = control.status().await;
    assert_eq!(venue.scans(), 2);
    assert_eq!(status.total_trades, 2);
    assert_eq!(status.tick_count, 2);
    assert_eq!(status.balance, dec!(81));
}

#[tokio::test]
async fn test_stop_from_another_task() {
    struct Sleepy;

    #[async_trait::async_trait]
    impl helm::engine::scheduler::Scheduler for Sleepy {
        async fn sleep(&self, _duration: Duration) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    let venue = MockVenue::new(dec!(100));
    let control = Arc::new(control_with(&venue, Arc::new(Sleepy)));
    let handle = control.handle();
    handle.start();

    let runner = {
        let control = control.clone();
        tokio::spawn(async move { control.run().await })
    };

    while handle.status().await.tick_count == 0 {
        tokio::task::yield_now().await;
    }
    handle.stop();

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("loop kept sleeping after stop")
        .unwrap();
    assert!(!handle.status().await.running);
}

#[tokio::test]
async fn test_unsizeable_candidate_does_not_drop_earlier_fill() {
    let venue = MockVenue::new(dec!(100));
    let huge = candidate(
        "HUGE",
        Direction::Long,
        dec!(2000000000000000000000000000),
        dec!(0.65),
    );
    assert!(huge.validate().is_ok());
    venue.push_feed(Feed::Candidates(vec![
        candidate("OK", Direction::Long, dec!(0.10), dec!(0.65)),
        huge,
    ]));

    let control = control(&venue);
    let report = control.tick().await.unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(report.skipped, 1);

    // Venue and ledger agree on what was filled.
    assert_eq!(venue.fills().len(), 1);
    assert_eq!(venue.balance(), dec!(90));
    let status = control.status().await;
    assert_eq!(status.total_trades, 1);
    assert_eq!(status.balance, dec!(90));
}
