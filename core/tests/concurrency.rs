//! Several kiosks racing on one slot over a shared database file.
//!
//! Each kiosk owns its own connection. Whatever the interleaving, the
//! slot must never exceed capacity, every bump must leave exactly one
//! audit row, and nobody may hold the slot twice.

use chrono::NaiveDate;
use overtime_core::{
    clock::FixedClock,
    config::PolicyConfig,
    engine::{AllocationEngine, SignupRequest},
    store::SlotStore,
    types::{SignupStatus, SlotCode},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

const KIOSKS: u64 = 4;
const ATTEMPTS_PER_KIOSK: usize = 25;
const CAPACITY: u32 = 3;

/// Removes the database file and its WAL companions on drop.
struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        let name = format!("overtime-race-{}.db", uuid::Uuid::new_v4());
        Self(std::env::temp_dir().join(name))
    }

    fn path(&self) -> &str {
        self.0.to_str().expect("utf-8 temp path")
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path()));
        }
    }
}

#[test]
fn racing_kiosks_never_overfill_a_slot() {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = TempDb::new();

    let now = NaiveDate::from_ymd_opt(2026, 10, 14)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid time");
    let store = SlotStore::open(db.path()).expect("open");
    store.migrate().expect("migrate");
    let mut base = AllocationEngine::new(store, PolicyConfig::default_test(), Arc::new(FixedClock::new(now)))
        .expect("engine");

    base.create_week(NaiveDate::from_ymd_opt(2026, 10, 19).expect("date")).expect("week");
    let target = NaiveDate::from_ymd_opt(2026, 10, 20).expect("date");
    let slot = base
        .store()
        .slots_between(target, target)
        .expect("slots")
        .into_iter()
        .find(|s| s.code == SlotCode::Late)
        .expect("late slot")
        .id;
    base.set_slot_capacity(slot, CAPACITY).expect("capacity");

    let handles: Vec<_> = (0..KIOSKS)
        .map(|kiosk| {
            let mut engine = base.for_kiosk().expect("kiosk connection");
            thread::spawn(move || {
                let mut rng = Pcg64::seed_from_u64(0x5107 + kiosk);
                (0..ATTEMPTS_PER_KIOSK)
                    .map(|_| {
                        let clock = format!("{:04}", rng.gen_range(1..=30u32));
                        engine
                            .signup(&SignupRequest::new(&clock, slot))
                            .expect("signup under contention")
                            .status
                    })
                    .collect::<Vec<SignupStatus>>()
            })
        })
        .collect();

    let statuses: Vec<SignupStatus> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("kiosk thread panicked"))
        .collect();
    let count = |wanted: SignupStatus| statuses.iter().filter(|s| **s == wanted).count();

    assert!(statuses.iter().all(|s| matches!(
        s,
        SignupStatus::Success | SignupStatus::Duplicate | SignupStatus::Bumped | SignupStatus::FullNoPriority
    )));

    let occupants = base.store().occupants(slot).expect("occupants");
    assert!(occupants.len() as u32 <= CAPACITY);
    assert_eq!(occupants.len(), count(SignupStatus::Success), "only plain successes grow the slot");
    assert_eq!(
        base.store().bump_event_count().expect("audit count") as usize,
        count(SignupStatus::Bumped),
        "one audit row per bump"
    );

    let unique: HashSet<String> = occupants
        .iter()
        .map(|o| o.employee.clock_number.to_string())
        .collect();
    assert_eq!(unique.len(), occupants.len(), "nobody holds the slot twice");

    for holder in &unique {
        let replay = base
            .signup(&SignupRequest::new(holder, slot))
            .expect("replay");
        assert_eq!(replay.status, SignupStatus::Duplicate);
    }
}
