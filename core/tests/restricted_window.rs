//! Second-shift forfeiture: today's late slot between 14:00 and 15:30.

use chrono::{NaiveDate, NaiveDateTime};
use overtime_core::{
    clock::FixedClock,
    engine::{AllocationEngine, SignupOutcome, SignupRequest},
    roster::SlotState,
    types::{BumpReason, SignupStatus, SlotCode, SlotId},
};
use std::sync::Arc;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    date(day).and_hms_opt(h, m, 0).expect("valid time")
}

/// Morning of Wednesday the 14th, with today's generated late slot and a
/// second "Press" late slot.
fn make_engine(capacity: u32) -> (AllocationEngine, Arc<FixedClock>, SlotId, SlotId) {
    let clock = Arc::new(FixedClock::new(at(14, 8, 0)));
    let mut engine = AllocationEngine::build_test(clock.clone()).expect("engine");
    engine.create_week(date(12)).expect("week");
    let late = engine
        .store()
        .slots_between(date(14), date(14))
        .expect("slots")
        .into_iter()
        .find(|s| s.code == SlotCode::Late && s.area.is_empty())
        .expect("late slot")
        .id;
    engine.set_slot_capacity(late, capacity).expect("capacity");
    let press = engine.add_slot(date(14), SlotCode::Late, "Press", 10).expect("press").id;
    (engine, clock, late, press)
}

fn sign(engine: &mut AllocationEngine, clock: &str, slot: SlotId) -> SignupOutcome {
    engine
        .signup(&SignupRequest::new(clock, slot))
        .expect("signup should not error")
}

fn occupants(engine: &AllocationEngine, slot: SlotId) -> Vec<String> {
    engine
        .store()
        .occupants(slot)
        .expect("occupants")
        .into_iter()
        .map(|o| o.employee.clock_number.to_string())
        .collect()
}

#[test]
fn first_late_claim_cannot_be_bumped_in_the_window() {
    let (mut engine, clock, late, _press) = make_engine(1);
    assert_eq!(sign(&mut engine, "0900", late).status, SignupStatus::Success);

    clock.set(at(14, 14, 30));
    let outcome = sign(&mut engine, "0001", late);
    assert_eq!(
        outcome.status,
        SignupStatus::FullNoBumpWindow,
        "seniority does not matter inside the window"
    );
    assert_eq!(occupants(&engine, late), vec!["0900"]);
    assert_eq!(engine.slot_state(late).expect("state"), SlotState::FullLocked);
}

#[test]
fn second_late_claim_is_forfeited() {
    let (mut engine, clock, late, press) = make_engine(1);
    assert_eq!(sign(&mut engine, "0005", press).status, SignupStatus::Success);
    clock.set(at(14, 8, 30));
    assert_eq!(sign(&mut engine, "0005", late).status, SignupStatus::Success);

    clock.set(at(14, 14, 0));
    assert_eq!(engine.slot_state(late).expect("state"), SlotState::FullContestable);

    let outcome = sign(&mut engine, "0900", late);
    assert_eq!(outcome.status, SignupStatus::BumpedSecondLate);
    assert_eq!(outcome.bumped_employee().map(|c| c.as_str()), Some("0005"));
    assert_eq!(outcome.reason, Some(BumpReason::SecondShiftForfeiture));

    assert_eq!(occupants(&engine, late), vec!["0900"]);
    assert_eq!(occupants(&engine, press), vec!["0005"], "the first late claim survives");

    let log = engine.bump_log(late).expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason, BumpReason::SecondShiftForfeiture);
}

#[test]
fn most_junior_second_late_holder_goes_first() {
    let (mut engine, clock, late, press) = make_engine(3);
    for c in ["0100", "0700"] {
        assert_eq!(sign(&mut engine, c, press).status, SignupStatus::Success);
    }
    clock.set(at(14, 9, 0));
    for c in ["0100", "0700", "0400"] {
        assert_eq!(sign(&mut engine, c, late).status, SignupStatus::Success);
    }

    clock.set(at(14, 15, 30));
    let outcome = sign(&mut engine, "0950", late);
    assert_eq!(outcome.status, SignupStatus::BumpedSecondLate);
    assert_eq!(outcome.bumped_employee().map(|c| c.as_str()), Some("0700"));
    assert_eq!(occupants(&engine, late), vec!["0100", "0400", "0950"]);
}

#[test]
fn window_still_admits_signups_with_space() {
    let (mut engine, clock, late, _press) = make_engine(2);
    assert_eq!(sign(&mut engine, "0100", late).status, SignupStatus::Success);

    clock.set(at(14, 14, 10));
    assert_eq!(engine.slot_state(late).expect("state"), SlotState::Available);
    assert_eq!(sign(&mut engine, "0200", late).status, SignupStatus::Success);
}

#[test]
fn after_the_window_the_slot_is_closed_for_the_day() {
    let (mut engine, clock, late, press) = make_engine(1);
    assert_eq!(sign(&mut engine, "0005", press).status, SignupStatus::Success);
    assert_eq!(sign(&mut engine, "0005", late).status, SignupStatus::Success);

    clock.set(at(14, 15, 31));
    assert_eq!(sign(&mut engine, "0900", late).status, SignupStatus::ClosedToday);
    assert_eq!(engine.slot_state(late).expect("state"), SlotState::Closed);
    assert_eq!(occupants(&engine, late), vec!["0005"]);
}

#[test]
fn forfeiture_applies_only_to_today() {
    // Tomorrow's late slot at 14:30 is an ordinary open slot.
    let (mut engine, clock, _late, _press) = make_engine(1);
    let tomorrow = engine
        .store()
        .slots_between(date(15), date(15))
        .expect("slots")
        .into_iter()
        .find(|s| s.code == SlotCode::Late)
        .expect("late slot")
        .id;
    engine.set_slot_capacity(tomorrow, 1).expect("capacity");
    assert_eq!(sign(&mut engine, "0900", tomorrow).status, SignupStatus::Success);

    clock.set(at(14, 14, 30));
    let outcome = sign(&mut engine, "0001", tomorrow);
    assert_eq!(outcome.status, SignupStatus::Bumped);
    assert_eq!(outcome.reason, Some(BumpReason::CategorySeniority));
}
