mod common;

use masaniello::core::{MatrixCache, Objective};
use masaniello::error::EngineError;
use masaniello::models::{CycleStatus, OperationStatus, Outcome};
use masaniello::session::{Session, SessionSnapshot};

use common::{config, engine, outcomes, progressive};

#[test]
fn three_operations_one_win_scenario() {
    let cache = MatrixCache::new();
    let mut e = engine(&cache, config(3, 1));

    let matrix = e.matrix().clone();
    assert!((matrix.get(0, 0).unwrap() - 1.107_411_456_056).abs() < 1e-9);

    let stake = e.operations()[0].amount;
    assert!((stake - 12.636_641_888_937).abs() < 1e-9);

    assert_eq!(e.mark_result(Outcome::Win).unwrap(), CycleStatus::Won);
    assert_eq!(e.operations().len(), 1);
    assert!((e.operations()[0].balance - (100.0 + stake * 0.85)).abs() < 1e-9);
}

#[test]
fn progressive_scenario_keeps_session_open() {
    let cache = MatrixCache::new();
    let cfg = progressive(3, 1, 50.0);
    let mut e = engine(&cache, cfg);
    let first = e.operations()[0].amount;
    let fraction = e.matrix().profit_fraction();

    // one sub-cycle won, one lost
    for outcome in outcomes("WLLL") {
        assert_eq!(e.mark_result(outcome).unwrap(), CycleStatus::Active);
    }

    let ops = e.operations();
    assert_eq!(ops.len(), 5);
    assert_eq!(ops[0].status, OperationStatus::Won { cycle: Some(1) });
    assert_eq!(ops[3].status, OperationStatus::Lost { cycle: Some(2) });

    // second sub-cycle sized against the reinvested bankroll
    assert!((ops[1].amount - first * (1.0 + fraction * 0.5)).abs() < 1e-9);
    // third sub-cycle compounds on the session-wide counter
    assert!((ops[4].amount - first * (1.0 + fraction * 0.5).powi(2)).abs() < 1e-9);
    assert!(ops[4].is_pending());
}

#[test]
fn must_win_every_operation() {
    let cache = MatrixCache::new();
    let mut e = engine(&cache, config(4, 4));

    let mut expected = 100.0;
    for _ in 0..3 {
        let op = e.operations().last().unwrap();
        assert!((op.amount - expected).abs() < 1e-9);
        e.mark_result(Outcome::Win).unwrap();
        expected *= 1.85;
    }

    assert_eq!(e.mark_result(Outcome::Loss).unwrap(), CycleStatus::Lost);
    assert!(e.operations().last().unwrap().balance.abs() < 1e-9);
}

#[test]
fn any_early_loss_loses_all_wins_cycle() {
    let cache = MatrixCache::new();
    let mut e = engine(&cache, config(5, 5));
    assert_eq!(e.mark_result(Outcome::Loss).unwrap(), CycleStatus::Lost);
    assert_eq!(e.mark_result(Outcome::Win), Err(EngineError::CycleClosed));
}

#[test]
fn terminal_cycle_recompute_is_noop() {
    let cache = MatrixCache::new();
    let mut e = engine(&cache, config(10, 4));
    for outcome in outcomes("WWLWW") {
        e.mark_result(outcome).unwrap();
    }
    assert_eq!(e.cycle_status(), CycleStatus::Won);
    assert!(e.operations().iter().all(|op| !op.is_pending()));

    let before = e.get_result();
    e.recalculate_from(e.operations().len());
    e.recalculate_from(3);
    assert_eq!(e.get_result(), before);
}

#[test]
fn session_edit_delete_restore_flow() {
    let cache = MatrixCache::new();
    let mut s = Session::new(1, "flow", config(10, 4), &cache).unwrap();
    for outcome in outcomes("LWLW") {
        s.mark_result(outcome).unwrap();
    }
    let before = s.snapshot();

    // fix a mistaken entry
    let second = s.operations()[1].id;
    s.update_result(second, Outcome::Loss).unwrap();
    assert_eq!(
        s.operations()[3].status,
        OperationStatus::LossesRemaining { remaining: 3 }
    );
    s.update_result(second, Outcome::Win).unwrap();
    assert_eq!(s.snapshot(), before);

    // delete the pending tail and bring it back
    let tail = s.operations().last().unwrap().id;
    s.delete_operation(tail).unwrap();
    assert!(s.operations().last().unwrap().is_pending());
    assert_ne!(s.operations().last().unwrap().id, tail);
    s.undo_delete().unwrap();
    assert_eq!(s.snapshot(), before);
}

#[test]
fn config_change_rebuilds_matrix_and_replays() {
    let cache = MatrixCache::new();
    let mut s = Session::new(1, "cfg", config(10, 4), &cache).unwrap();
    for outcome in outcomes("LLW") {
        s.mark_result(outcome).unwrap();
    }

    let richer = masaniello::config::CycleConfig {
        broker_payout: 90.0,
        total_risk: 200.0,
        ..config(10, 4)
    };
    s.update_config(richer, &cache).unwrap();
    assert_eq!(cache.len(), 2);

    let fresh = {
        let mut e = engine(&cache, richer);
        for outcome in outcomes("LLW") {
            e.mark_result(outcome).unwrap();
        }
        e
    };
    assert_eq!(s.operations().len(), fresh.operations().len());
    for (a, b) in s.operations().iter().zip(fresh.operations()) {
        assert_eq!(a.result, b.result);
        assert!((a.amount - b.amount).abs() < 1e-9);
        assert!((a.balance - b.balance).abs() < 1e-9);
    }

    let objective = Objective::new(s.config(), s.engine().matrix());
    assert_eq!(s.objective(), objective);
}

#[test]
fn snapshot_survives_json() {
    let cache = MatrixCache::new();
    let mut s = Session::new(3, "persist", progressive(6, 2, 25.0), &cache).unwrap();
    for outcome in outcomes("WWLW") {
        s.mark_result(outcome).unwrap();
    }

    let json = serde_json::to_string_pretty(&s.snapshot()).unwrap();
    let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot.cycle_status, CycleStatus::Active);

    let restored = Session::restore(snapshot, &cache).unwrap();
    assert_eq!(restored.name, "persist");
    assert_eq!(restored.operations().len(), s.operations().len());
    assert_eq!(
        restored.engine().next_stake().map(|x| (x * 1e6).round()),
        s.engine().next_stake().map(|x| (x * 1e6).round())
    );
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let cache = MatrixCache::new();
    let err = Session::new(1, "bad", config(3, 5), &cache).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    assert!(cache.is_empty());
}
