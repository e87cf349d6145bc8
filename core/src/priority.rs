//! Priority comparator: orders occupants of a full slot and decides
//! whether a challenger may displace the weakest one.
//!
//! ORDER (weakest first, lexicographic):
//!   1. Standing class: SecondShiftHolder < CategoryMismatch < CategoryMatch.
//!      Within SecondShiftHolder a non-matching occupant is weaker.
//!   2. Shift priority (only when enabled): rotating < day.
//!   3. Seniority: the most junior is weakest.
//!
//! The challenger wins against the weakest occupant iff it matches the
//! slot's categories and the occupant does not, or the match flags are
//! equal and the challenger is strictly more senior (after shift priority,
//! when enabled).

use crate::{
    config::SeniorityBasis,
    types::{BumpReason, ClockNumber, ShiftType},
};
use std::cmp::Ordering;

/// Seniority key. Lower is more senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seniority {
    rank: u32,
    clock: u16,
}

impl Seniority {
    /// Nobody can outrank this key.
    pub const MOST_SENIOR: Seniority = Seniority { rank: 0, clock: 0 };

    pub fn of(clock: &ClockNumber, rank: Option<u32>, basis: SeniorityBasis) -> Self {
        match basis {
            SeniorityBasis::ClockNumber => Self { rank: 0, clock: clock.value() },
            // Higher rank is more senior; a missing rank counts as 0.
            SeniorityBasis::Rank => Self {
                rank: u32::MAX - rank.unwrap_or(0),
                clock: clock.value(),
            },
        }
    }

    pub fn is_more_senior_than(&self, other: &Seniority) -> bool {
        self < other
    }
}

/// Coarse standing of an occupant. Derived `Ord` is the bump order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandingClass {
    /// The occupant's second-or-later late claim today.
    SecondShiftHolder { matches: bool },
    CategoryMismatch,
    CategoryMatch,
}

impl StandingClass {
    pub fn new(forfeits: bool, matches: bool) -> Self {
        match (forfeits, matches) {
            (true, m) => Self::SecondShiftHolder { matches: m },
            (false, false) => Self::CategoryMismatch,
            (false, true) => Self::CategoryMatch,
        }
    }

    pub fn matches(&self) -> bool {
        match self {
            Self::SecondShiftHolder { matches } => *matches,
            Self::CategoryMismatch => false,
            Self::CategoryMatch => true,
        }
    }
}

/// Everything the comparator needs to know about one claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub class: StandingClass,
    pub shift: ShiftType,
    pub seniority: Seniority,
}

impl Standing {
    /// Total order over occupants: `Less` means weaker.
    pub fn compare(&self, other: &Standing, shift_priority: bool) -> Ordering {
        self.class
            .cmp(&other.class)
            .then_with(|| {
                if shift_priority {
                    self.shift.priority().cmp(&other.shift.priority())
                } else {
                    Ordering::Equal
                }
            })
            // Junior (larger key) is weaker, so compare reversed.
            .then_with(|| other.seniority.cmp(&self.seniority))
    }
}

/// Outcome of a challenge against the weakest occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Displace(BumpReason),
    Hold,
}

/// Index of the weakest standing, first on ties.
pub fn weakest<T, F>(items: &[T], standing: F, shift_priority: bool) -> Option<usize>
where
    F: Fn(&T) -> Standing,
{
    items
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            standing(a)
                .compare(&standing(b), shift_priority)
                .then_with(|| ia.cmp(ib))
        })
        .map(|(i, _)| i)
}

/// Decide a general-priority challenge. `challenger.class` must be built
/// with `forfeits = false`; only the match flag is read from it.
pub fn challenge(challenger: &Standing, weakest: &Standing, shift_priority: bool) -> Verdict {
    let (cm, wm) = (challenger.class.matches(), weakest.class.matches());
    if cm && !wm {
        return Verdict::Displace(BumpReason::CategorySeniority);
    }
    if cm != wm {
        return Verdict::Hold;
    }
    if shift_priority {
        match challenger.shift.priority().cmp(&weakest.shift.priority()) {
            Ordering::Greater => return Verdict::Displace(BumpReason::ShiftPriority),
            Ordering::Less => return Verdict::Hold,
            Ordering::Equal => {}
        }
    }
    if challenger.seniority.is_more_senior_than(&weakest.seniority) {
        Verdict::Displace(BumpReason::CategorySeniority)
    } else {
        Verdict::Hold
    }
}

/// Could any conceivable challenger beat this weakest occupant?
pub fn is_contestable(weakest: &Standing, shift_priority: bool) -> bool {
    let ideal = Standing {
        class: StandingClass::CategoryMatch,
        shift: ShiftType::Day,
        seniority: Seniority::MOST_SENIOR,
    };
    matches!(challenge(&ideal, weakest, shift_priority), Verdict::Displace(_))
}
