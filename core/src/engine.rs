//! The allocation engine: decides every signup attempt.
//!
//! EVALUATION ORDER (fixed, inside the slot lock):
//!   1. Slot lookup                        -> not_found
//!   2. Part validated against slot code   -> InvalidPart error
//!   3. Employee resolved or created
//!   4. Duplicate guard                    -> duplicate
//!   5. Week lifecycle                     -> closed
//!   6. Daily limits                       -> limit_early | limit_late
//!   7. Time window                        -> frozen | closed_today
//!   8. Capacity, then weekend / restricted / general bump
//!
//! RULES:
//!   - The clock number is validated before any transaction opens.
//!   - Read, decide, mutate and audit happen in one `with_slot_lock` call.
//!   - Change events are dispatched only after commit.

use crate::{
    clock::{Clock, SystemClock},
    config::PolicyConfig,
    error::{OvertimeError, OvertimeResult},
    event::{BumpEventRecord, ChangeEvent},
    notifier::{ChangeListener, Notifier},
    priority::{self, Seniority, Standing, StandingClass, Verdict},
    store::{EmployeeProfile, EmployeeRecord, OccupantRecord, SlotRecord, SlotStore},
    types::{
        category_match, BumpReason, ClockNumber, SignupId, SignupStatus, SlotCode, SlotId,
        WeekendPart,
    },
    weekend::{self, PartPlan},
    window::{self, WindowState},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One kiosk signup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub clock_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub slot_id: SlotId,
    #[serde(default)]
    pub part: Option<WeekendPart>,
}

impl SignupRequest {
    pub fn new(clock_number: &str, slot_id: SlotId) -> Self {
        Self {
            clock_number: clock_number.to_string(),
            name: String::new(),
            phone: None,
            slot_id,
            part: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn with_part(mut self, part: WeekendPart) -> Self {
        self.part = Some(part);
        self
    }
}

/// Terminal result of a signup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupOutcome {
    pub status: SignupStatus,
    pub slot_id: SlotId,
    pub clock_number: ClockNumber,
    /// Everyone removed by this attempt, in removal order.
    pub displaced: Vec<ClockNumber>,
    pub reason: Option<BumpReason>,
}

impl SignupOutcome {
    fn new(status: SignupStatus, slot_id: SlotId, clock_number: &ClockNumber) -> Self {
        Self {
            status,
            slot_id,
            clock_number: clock_number.clone(),
            displaced: Vec::new(),
            reason: None,
        }
    }

    /// The (first) employee displaced, if this attempt bumped anyone.
    pub fn bumped_employee(&self) -> Option<&ClockNumber> {
        self.displaced.first()
    }
}

/// Decision plus the events to publish once it commits.
struct Attempt {
    outcome: SignupOutcome,
    events: Vec<ChangeEvent>,
}

impl Attempt {
    fn status(status: SignupStatus, slot_id: SlotId, clock: &ClockNumber) -> Self {
        Self {
            outcome: SignupOutcome::new(status, slot_id, clock),
            events: Vec::new(),
        }
    }
}

pub struct AllocationEngine {
    pub(crate) store: SlotStore,
    pub(crate) config: PolicyConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Notifier,
}

impl AllocationEngine {
    pub fn new(store: SlotStore, config: PolicyConfig, clock: Arc<dyn Clock>) -> OvertimeResult<Self> {
        store.set_busy_timeout(config.busy_timeout_ms)?;
        Ok(Self {
            store,
            config,
            clock,
            notifier: Notifier::new(),
        })
    }

    /// Engine on the host wall clock.
    pub fn build(store: SlotStore, config: PolicyConfig) -> OvertimeResult<Self> {
        Self::new(store, config, Arc::new(SystemClock))
    }

    /// Fresh migrated in-memory engine (used in tests).
    pub fn build_test(clock: Arc<dyn Clock>) -> OvertimeResult<Self> {
        let store = SlotStore::in_memory()?;
        store.migrate()?;
        Self::new(store, PolicyConfig::default_test(), clock)
    }

    /// Another engine over a new connection to the same database, sharing
    /// this engine's clock and configuration. One per kiosk.
    pub fn for_kiosk(&self) -> OvertimeResult<Self> {
        Self::new(self.store.reopen()?, self.config.clone(), Arc::clone(&self.clock))
    }

    pub fn subscribe(&mut self, listener: Box<dyn ChangeListener>) {
        self.notifier.register(listener);
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// The primary operation: one kiosk signup attempt.
    pub fn signup(&mut self, request: &SignupRequest) -> OvertimeResult<SignupOutcome> {
        let clock_number = ClockNumber::parse(&request.clock_number)?;

        let attempt = self.store.with_slot_lock(request.slot_id, |store| {
            let now = self.clock.now();
            attempt(store, &self.config, now, &clock_number, request)
        })?;

        log::info!(
            "slot={} clock={} status={}{}",
            request.slot_id,
            clock_number,
            attempt.outcome.status,
            match attempt.outcome.bumped_employee() {
                Some(c) => format!(" displaced={c}"),
                None => String::new(),
            }
        );

        self.publish(&attempt.events);
        Ok(attempt.outcome)
    }

    pub(crate) fn publish(&mut self, events: &[ChangeEvent]) {
        if !events.is_empty() {
            self.notifier.dispatch(events);
        }
    }
}

// ── Decision ───────────────────────────────────────────────────

fn attempt(
    store: &SlotStore,
    cfg: &PolicyConfig,
    now: NaiveDateTime,
    clock: &ClockNumber,
    request: &SignupRequest,
) -> OvertimeResult<Attempt> {
    let Some(slot) = store.slot(request.slot_id)? else {
        return Ok(Attempt::status(SignupStatus::NotFound, request.slot_id, clock));
    };
    let part = validate_part(&slot, request.part)?;

    let mut events = Vec::new();
    let employee = resolve_employee(store, clock, request, &mut events)?;
    let mut result = decide(store, cfg, now, &slot, &employee, part)?;

    events.append(&mut result.events);
    result.events = events;
    Ok(result)
}

fn decide(
    store: &SlotStore,
    cfg: &PolicyConfig,
    now: NaiveDateTime,
    slot: &SlotRecord,
    employee: &EmployeeRecord,
    part: Option<WeekendPart>,
) -> OvertimeResult<Attempt> {
    let clock = &employee.clock_number;
    let reject = |status: SignupStatus| -> OvertimeResult<Attempt> {
        Ok(Attempt::status(status, slot.id, clock))
    };

    if store.signup_for(employee.id, slot.id)?.is_some() {
        return reject(SignupStatus::Duplicate);
    }

    if let Some(status) = slot.week_status {
        if !status.accepts_signups() {
            return reject(SignupStatus::Closed);
        }
    }

    let counts = store.day_counts(employee.id, slot.date)?;
    match slot.code {
        SlotCode::Early if counts.early >= cfg.early_daily_limit => {
            return reject(SignupStatus::LimitEarly);
        }
        SlotCode::Late if counts.late >= cfg.late_daily_limit => {
            return reject(SignupStatus::LimitLate);
        }
        _ => {}
    }

    let window = window::classify(slot.date, slot.code, slot.week_status, now, cfg);
    match window {
        WindowState::Frozen => return reject(SignupStatus::Frozen),
        WindowState::Closed => return reject(SignupStatus::ClosedToday),
        WindowState::Open | WindowState::BumpRestricted => {}
    }

    let occupants = store.occupants(slot.id)?;

    if let (SlotCode::Weekend, Some(part)) = (slot.code, part) {
        return weekend_claim(store, cfg, now, slot, employee, part, &occupants);
    }

    let taken = occupants.len() as u32;
    if taken < slot.capacity {
        let mut attempt = Attempt::status(SignupStatus::Success, slot.id, clock);
        place(store, slot, employee, None, now, &mut attempt)?;
        return Ok(attempt);
    }
    // Over capacity (admin lowered it) or nobody to displace.
    if taken > slot.capacity || occupants.is_empty() {
        return reject(SignupStatus::FullNoPriority);
    }

    if window == WindowState::BumpRestricted {
        restricted_bump(store, cfg, now, slot, employee, &occupants)
    } else {
        general_bump(store, cfg, now, slot, employee, &occupants, None)
    }
}

fn validate_part(slot: &SlotRecord, part: Option<WeekendPart>) -> OvertimeResult<Option<WeekendPart>> {
    match (slot.code, part) {
        (SlotCode::Weekend, Some(p)) => Ok(Some(p)),
        (SlotCode::Weekend, None) => Err(OvertimeError::InvalidPart {
            detail: format!("slot {} is a weekend slot; choose first4, full8 or last4", slot.id),
        }),
        (_, Some(p)) => Err(OvertimeError::InvalidPart {
            detail: format!("slot {} ({}) does not take part '{}'", slot.id, slot.code, p.as_str()),
        }),
        (_, None) => Ok(None),
    }
}

/// Resolve by exact clock number, creating on first signup.
/// Name and phone are only filled where previously blank.
fn resolve_employee(
    store: &SlotStore,
    clock: &ClockNumber,
    request: &SignupRequest,
    events: &mut Vec<ChangeEvent>,
) -> OvertimeResult<EmployeeRecord> {
    if let Some(existing) = store.find_employee(clock)? {
        if store.fill_blank_contact(existing.id, &request.name, request.phone.as_deref())? {
            events.push(ChangeEvent::EmployeeUpdated { clock_number: clock.clone() });
            log::info!("clock={clock} contact filled at kiosk");
        }
        return Ok(existing);
    }

    let profile = EmployeeProfile {
        name: request.name.trim().to_string(),
        phone: request.phone.clone(),
        ..EmployeeProfile::default()
    };
    let id = store.insert_employee(clock, &profile)?;
    events.push(ChangeEvent::EmployeeCreated { clock_number: clock.clone() });
    log::info!("clock={clock} employee created at kiosk");

    store
        .employee_by_id(id)?
        .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })
}

/// Restricted window: only a second-late holder can be displaced, most
/// junior first.
fn restricted_bump(
    store: &SlotStore,
    cfg: &PolicyConfig,
    now: NaiveDateTime,
    slot: &SlotRecord,
    employee: &EmployeeRecord,
    occupants: &[OccupantRecord],
) -> OvertimeResult<Attempt> {
    let loser = occupants
        .iter()
        .filter(|o| o.is_second_late())
        .max_by_key(|o| seniority_of(&o.employee, cfg));

    let Some(loser) = loser else {
        log::debug!("slot={} restricted window: no second-late occupant", slot.id);
        return Ok(Attempt::status(
            SignupStatus::FullNoBumpWindow,
            slot.id,
            &employee.clock_number,
        ));
    };

    let mut attempt = Attempt::status(SignupStatus::BumpedSecondLate, slot.id, &employee.clock_number);
    displace(store, slot, employee, &[loser], BumpReason::SecondShiftForfeiture, None, now, &mut attempt)?;
    Ok(attempt)
}

/// Open window, slot exactly full: challenge the weakest occupant among
/// `occupants`.
fn general_bump(
    store: &SlotStore,
    cfg: &PolicyConfig,
    now: NaiveDateTime,
    slot: &SlotRecord,
    employee: &EmployeeRecord,
    occupants: &[OccupantRecord],
    part: Option<WeekendPart>,
) -> OvertimeResult<Attempt> {
    let challenger = Standing {
        class: StandingClass::new(false, category_match(&slot.required, &employee.categories)),
        shift: employee.shift_type,
        seniority: seniority_of(employee, cfg),
    };

    let standing = |o: &OccupantRecord| occupant_standing(o, slot, cfg);
    let Some(idx) = priority::weakest(occupants, &standing, cfg.shift_priority) else {
        return Ok(Attempt::status(SignupStatus::FullNoPriority, slot.id, &employee.clock_number));
    };
    let weakest = &occupants[idx];

    match priority::challenge(&challenger, &standing(weakest), cfg.shift_priority) {
        Verdict::Hold => {
            log::debug!(
                "slot={} clock={} cannot outrank weakest occupant {}",
                slot.id,
                employee.clock_number,
                weakest.employee.clock_number
            );
            Ok(Attempt::status(SignupStatus::FullNoPriority, slot.id, &employee.clock_number))
        }
        Verdict::Displace(reason) => {
            let mut attempt = Attempt::status(SignupStatus::Bumped, slot.id, &employee.clock_number);
            displace(store, slot, employee, &[weakest], reason, part, now, &mut attempt)?;
            Ok(attempt)
        }
    }
}

fn weekend_claim(
    store: &SlotStore,
    cfg: &PolicyConfig,
    now: NaiveDateTime,
    slot: &SlotRecord,
    employee: &EmployeeRecord,
    part: WeekendPart,
    occupants: &[OccupantRecord],
) -> OvertimeResult<Attempt> {
    let clock = &employee.clock_number;
    match weekend::plan(part, slot.capacity, occupants) {
        PartPlan::Insert => {
            let mut attempt = Attempt::status(SignupStatus::Success, slot.id, clock);
            place(store, slot, employee, Some(part), now, &mut attempt)?;
            Ok(attempt)
        }
        PartPlan::OverrideThenInsert { removed } => {
            let losers: Vec<&OccupantRecord> = occupants
                .iter()
                .filter(|o| removed.contains(&o.signup_id))
                .collect();
            let mut attempt = Attempt::status(SignupStatus::Bumped, slot.id, clock);
            displace(
                store,
                slot,
                employee,
                &losers,
                BumpReason::WeekendFull8Override,
                Some(part),
                now,
                &mut attempt,
            )?;
            Ok(attempt)
        }
        PartPlan::Contest { candidates } => {
            let contested: Vec<OccupantRecord> = occupants
                .iter()
                .filter(|o| candidates.contains(&o.signup_id))
                .cloned()
                .collect();
            general_bump(store, cfg, now, slot, employee, &contested, Some(part))
        }
        PartPlan::RejectFull8Held | PartPlan::NoRoom => {
            Ok(Attempt::status(SignupStatus::FullNoPriority, slot.id, clock))
        }
    }
}

// ── Mutations (always inside the slot lock) ────────────────────

fn place(
    store: &SlotStore,
    slot: &SlotRecord,
    employee: &EmployeeRecord,
    part: Option<WeekendPart>,
    now: NaiveDateTime,
    attempt: &mut Attempt,
) -> OvertimeResult<SignupId> {
    let id = store.insert_signup(slot.id, employee.id, part, now)?;
    attempt.events.push(ChangeEvent::SignupRecorded {
        slot_id: slot.id,
        clock_number: employee.clock_number.clone(),
        part,
    });
    Ok(id)
}

/// Remove every loser, insert the winner and audit each removal. Runs
/// entirely inside the caller's transaction.
#[allow(clippy::too_many_arguments)]
fn displace(
    store: &SlotStore,
    slot: &SlotRecord,
    winner: &EmployeeRecord,
    losers: &[&OccupantRecord],
    reason: BumpReason,
    part: Option<WeekendPart>,
    now: NaiveDateTime,
    attempt: &mut Attempt,
) -> OvertimeResult<SignupId> {
    for loser in losers {
        store.delete_signup(loser.signup_id)?;
    }
    let id = store.insert_signup(slot.id, winner.id, part, now)?;

    for loser in losers {
        store.append_bump_event(&BumpEventRecord {
            id: None,
            slot_id: slot.id,
            winner: winner.clock_number.clone(),
            displaced: loser.employee.clock_number.clone(),
            reason,
            created_at: now,
        })?;
        attempt.outcome.displaced.push(loser.employee.clock_number.clone());
        attempt.events.push(ChangeEvent::SignupBumped {
            slot_id: slot.id,
            winner: winner.clock_number.clone(),
            displaced: loser.employee.clock_number.clone(),
            reason,
        });
    }
    attempt.outcome.reason = Some(reason);
    Ok(id)
}

// ── Standing helpers ───────────────────────────────────────────

pub(crate) fn seniority_of(employee: &EmployeeRecord, cfg: &PolicyConfig) -> Seniority {
    Seniority::of(&employee.clock_number, employee.seniority_rank, cfg.seniority_basis)
}

pub(crate) fn occupant_standing(o: &OccupantRecord, slot: &SlotRecord, cfg: &PolicyConfig) -> Standing {
    let forfeits = slot.code == SlotCode::Late && o.is_second_late();
    Standing {
        class: StandingClass::new(forfeits, category_match(&slot.required, &o.employee.categories)),
        shift: o.employee.shift_type,
        seniority: seniority_of(&o.employee, cfg),
    }
}
