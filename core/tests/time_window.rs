//! Freeze and close windows, through the engine and as a pure function.
//!
//! Calendar used throughout: 2026-10-12 is a Monday, "today" is
//! Wednesday 2026-10-14 unless a test moves the clock.

use chrono::{NaiveDate, NaiveDateTime};
use overtime_core::{
    clock::FixedClock,
    config::PolicyConfig,
    engine::{AllocationEngine, SignupOutcome, SignupRequest},
    store::SlotStore,
    types::{SignupStatus, SlotCode, SlotId, WeekStatus, WeekendPart},
    window::{classify, WindowState},
};
use std::sync::Arc;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    date(day).and_hms_opt(h, m, 0).expect("valid time")
}

fn make_engine(now: NaiveDateTime) -> (AllocationEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let mut engine = AllocationEngine::build_test(clock.clone()).expect("engine");
    engine.create_week(date(12)).expect("week of the 12th");
    (engine, clock)
}

fn open_slot(engine: &mut AllocationEngine, day: u32, code: SlotCode, capacity: u32) -> SlotId {
    let id = engine
        .store()
        .slots_between(date(day), date(day))
        .expect("slots")
        .into_iter()
        .find(|s| s.code == code && s.area.is_empty())
        .expect("generated slot")
        .id;
    engine.set_slot_capacity(id, capacity).expect("capacity");
    id
}

fn sign(engine: &mut AllocationEngine, clock: &str, slot: SlotId) -> SignupOutcome {
    engine
        .signup(&SignupRequest::new(clock, slot))
        .expect("signup should not error")
}

// ── Early slots ────────────────────────────────────────────────

#[test]
fn early_slot_freezes_at_two_pm_the_day_before() {
    let (mut engine, clock) = make_engine(at(14, 13, 59));
    let thursday = open_slot(&mut engine, 15, SlotCode::Early, 5);

    assert_eq!(sign(&mut engine, "0100", thursday).status, SignupStatus::Success);

    clock.set(at(14, 14, 0));
    assert_eq!(
        sign(&mut engine, "0200", thursday).status,
        SignupStatus::Frozen,
        "14:00 on the prior day is the freeze instant"
    );
    assert_eq!(engine.store().slot_taken(thursday).expect("taken"), 1);
}

#[test]
fn past_early_slots_are_never_frozen() {
    let (mut engine, _clock) = make_engine(at(14, 16, 0));
    let tuesday = open_slot(&mut engine, 13, SlotCode::Early, 2);
    assert_eq!(sign(&mut engine, "0100", tuesday).status, SignupStatus::Success);
}

// ── Today's late slot ──────────────────────────────────────────

#[test]
fn todays_late_slot_moves_through_open_restricted_closed() {
    let (mut engine, clock) = make_engine(at(14, 13, 59));
    let late = open_slot(&mut engine, 14, SlotCode::Late, 10);

    assert_eq!(sign(&mut engine, "0001", late).status, SignupStatus::Success);

    clock.set(at(14, 14, 0));
    assert_eq!(
        sign(&mut engine, "0002", late).status,
        SignupStatus::Success,
        "restricted window still admits signups while there is space"
    );

    clock.set(at(14, 15, 30));
    assert_eq!(
        sign(&mut engine, "0003", late).status,
        SignupStatus::Success,
        "15:30 is inside the window"
    );

    clock.set(at(14, 15, 31));
    assert_eq!(sign(&mut engine, "0004", late).status, SignupStatus::ClosedToday);
    assert_eq!(engine.store().slot_taken(late).expect("taken"), 3);
}

#[test]
fn late_slots_on_other_days_are_never_time_gated() {
    let (mut engine, _clock) = make_engine(at(14, 17, 0));
    let thursday_late = open_slot(&mut engine, 15, SlotCode::Late, 1);
    assert_eq!(sign(&mut engine, "0100", thursday_late).status, SignupStatus::Success);
}

// ── Weekend ────────────────────────────────────────────────────

#[test]
fn weekend_freezes_friday_half_past_three() {
    let (mut engine, clock) = make_engine(at(16, 15, 29));
    let saturday = open_slot(&mut engine, 17, SlotCode::Weekend, 4);
    let sunday = open_slot(&mut engine, 18, SlotCode::Weekend, 4);

    let req = SignupRequest::new("0100", saturday).with_part(WeekendPart::Full8);
    assert_eq!(engine.signup(&req).expect("signup").status, SignupStatus::Success);

    clock.set(at(16, 15, 30));
    for slot in [saturday, sunday] {
        let req = SignupRequest::new("0200", slot).with_part(WeekendPart::First4);
        assert_eq!(engine.signup(&req).expect("signup").status, SignupStatus::Frozen);
    }
}

// ── Week lifecycle overrides every time rule ───────────────────

#[test]
fn closed_week_rejects_even_with_space() {
    let (mut engine, _clock) = make_engine(at(14, 9, 0));
    let slot = open_slot(&mut engine, 15, SlotCode::Late, 10);
    let week = engine.store().week_by_start(date(12)).expect("read").expect("week");

    engine.set_week_status(week.id, WeekStatus::Closed).expect("close");
    assert_eq!(sign(&mut engine, "0100", slot).status, SignupStatus::Closed);

    engine.set_slot_capacity(slot, 50).expect("capacity");
    assert_eq!(
        sign(&mut engine, "0100", slot).status,
        SignupStatus::Closed,
        "raising capacity does not lift a week closure"
    );
}

#[test]
fn draft_week_is_not_yet_open() {
    let clock = Arc::new(FixedClock::new(at(14, 9, 0)));
    let store = SlotStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    let config = PolicyConfig {
        default_week_status: WeekStatus::Draft,
        ..PolicyConfig::default_test()
    };
    let mut engine = AllocationEngine::new(store, config, clock).expect("engine");
    let week = engine.create_week(date(19)).expect("week");
    let slot = open_slot(&mut engine, 20, SlotCode::Early, 3);

    assert_eq!(sign(&mut engine, "0100", slot).status, SignupStatus::Closed);

    engine.set_week_status(week.id, WeekStatus::Published).expect("publish");
    assert_eq!(sign(&mut engine, "0100", slot).status, SignupStatus::Success);
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn configured_close_time_moves_the_window() {
    let clock = Arc::new(FixedClock::new(at(14, 15, 45)));
    let store = SlotStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    let config: PolicyConfig =
        serde_json::from_str(r#"{ "late_close": "16:00" }"#).expect("partial config");
    let mut engine = AllocationEngine::new(store, config, clock).expect("engine");
    engine.create_week(date(12)).expect("week");
    let late = open_slot(&mut engine, 14, SlotCode::Late, 2);

    assert_eq!(sign(&mut engine, "0100", late).status, SignupStatus::Success);
}

#[test]
fn classify_boundaries() {
    let cfg = PolicyConfig::default_test();
    let today = date(14);

    let cases = [
        (at(14, 13, 59), WindowState::Open),
        (at(14, 14, 0), WindowState::BumpRestricted),
        (at(14, 15, 30), WindowState::BumpRestricted),
        (at(14, 15, 31), WindowState::Closed),
    ];
    for (now, expected) in cases {
        assert_eq!(
            classify(today, SlotCode::Late, Some(WeekStatus::Published), now, &cfg),
            expected,
            "late slot at {now}"
        );
    }

    assert_eq!(
        classify(date(15), SlotCode::Early, None, at(14, 14, 0), &cfg),
        WindowState::Frozen
    );
    assert_eq!(
        classify(date(15), SlotCode::Early, Some(WeekStatus::Closed), at(13, 9, 0), &cfg),
        WindowState::Closed
    );
}
