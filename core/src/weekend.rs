//! Weekend part resolution.
//!
//! Every weekend claim, partial (`first4`/`last4`) or `full8`, takes one
//! place out of the slot's capacity. Full-day claims outrank partial
//! claims: a `full8` removes every partial claim on the slot, and a partial
//! claim against an existing `full8` is refused. The slot therefore never
//! mixes partial and full-day claims.

use crate::types::{SignupId, WeekendPart};
use chrono::NaiveDateTime;

/// The minimum a resolver needs to know about a live weekend claim.
pub trait PartClaim {
    fn signup_id(&self) -> SignupId;
    fn part(&self) -> Option<WeekendPart>;
    fn created_at(&self) -> NaiveDateTime;
}

/// What the engine should do with a new weekend claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartPlan {
    /// Room available, nothing to remove.
    Insert,
    /// Room once these partial claims are removed.
    OverrideThenInsert { removed: Vec<SignupId> },
    /// A full-day claim already holds the slot.
    RejectFull8Held,
    /// No free place; contest the weakest of these same-kind occupants.
    Contest { candidates: Vec<SignupId> },
    /// No place left and nobody of the same kind can be displaced.
    NoRoom,
}

pub fn plan<C: PartClaim>(part: WeekendPart, capacity: u32, claims: &[C]) -> PartPlan {
    let full8: Vec<&C> = claims.iter().filter(|c| !is_partial(*c)).collect();
    let partial: Vec<&C> = claims.iter().filter(|c| is_partial(*c)).collect();

    if part.is_partial() {
        if !full8.is_empty() {
            return PartPlan::RejectFull8Held;
        }
        return by_occupancy(capacity, &partial);
    }

    if !partial.is_empty() && (full8.len() as u32) < capacity {
        return PartPlan::OverrideThenInsert {
            removed: partial.iter().map(|c| c.signup_id()).collect(),
        };
    }
    by_occupancy(capacity, &full8)
}

/// Room left among claims of one kind. Only an exactly-full slot is
/// contested; an over-full one (capacity lowered by an admin) stays locked.
fn by_occupancy<C: PartClaim>(capacity: u32, same_kind: &[&C]) -> PartPlan {
    let taken = same_kind.len() as u32;
    if taken < capacity {
        PartPlan::Insert
    } else if taken == capacity && taken > 0 {
        PartPlan::Contest {
            candidates: same_kind.iter().map(|c| c.signup_id()).collect(),
        }
    } else {
        PartPlan::NoRoom
    }
}

/// Winners to show for one weekend position: the earliest `full8` alone,
/// otherwise the earliest `first4` and earliest `last4`, otherwise up to
/// two earliest claims of whichever part exists.
pub fn winners<C: PartClaim>(claims: &[C]) -> Vec<&C> {
    let mut ordered: Vec<&C> = claims.iter().collect();
    ordered.sort_by_key(|c| (c.created_at(), c.signup_id()));

    if let Some(full) = ordered.iter().find(|c| !is_partial(**c)) {
        return vec![*full];
    }

    let first = ordered.iter().find(|c| c.part() == Some(WeekendPart::First4));
    let last = ordered.iter().find(|c| c.part() == Some(WeekendPart::Last4));
    match (first, last) {
        (Some(f), Some(l)) => {
            let mut pair = vec![*f, *l];
            pair.sort_by_key(|c| (c.created_at(), c.signup_id()));
            pair
        }
        _ => ordered.into_iter().take(2).collect(),
    }
}

fn is_partial<C: PartClaim>(claim: &C) -> bool {
    claim.part().map(|p| p.is_partial()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[derive(Debug, Clone, PartialEq)]
    struct Claim {
        id: SignupId,
        part: WeekendPart,
        at: NaiveDateTime,
    }

    impl PartClaim for Claim {
        fn signup_id(&self) -> SignupId {
            self.id
        }
        fn part(&self) -> Option<WeekendPart> {
            Some(self.part)
        }
        fn created_at(&self) -> NaiveDateTime {
            self.at
        }
    }

    fn claim(id: SignupId, part: WeekendPart, minute: i64) -> Claim {
        let base = NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        Claim { id, part, at: base + Duration::minutes(minute) }
    }

    #[test]
    fn full8_overrides_partial_claims() {
        let claims = vec![claim(1, WeekendPart::First4, 0), claim(2, WeekendPart::Last4, 1)];
        assert_eq!(
            plan(WeekendPart::Full8, 2, &claims),
            PartPlan::OverrideThenInsert { removed: vec![1, 2] }
        );
    }

    #[test]
    fn partial_refused_when_full8_held() {
        let claims = vec![claim(1, WeekendPart::Full8, 0)];
        assert_eq!(plan(WeekendPart::Last4, 3, &claims), PartPlan::RejectFull8Held);
    }

    #[test]
    fn each_partial_claim_takes_one_place() {
        let one = vec![claim(1, WeekendPart::First4, 0)];
        assert_eq!(plan(WeekendPart::Last4, 2, &one), PartPlan::Insert);
        assert_eq!(
            plan(WeekendPart::First4, 1, &one),
            PartPlan::Contest { candidates: vec![1] }
        );

        let two = vec![claim(1, WeekendPart::First4, 0), claim(2, WeekendPart::Last4, 1)];
        assert_eq!(
            plan(WeekendPart::First4, 2, &two),
            PartPlan::Contest { candidates: vec![1, 2] }
        );
        assert_eq!(plan(WeekendPart::Last4, 1, &two), PartPlan::NoRoom);
    }

    #[test]
    fn full8_contests_when_full_days_fill_the_slot() {
        let held = vec![claim(1, WeekendPart::Full8, 0)];
        assert_eq!(plan(WeekendPart::Full8, 2, &held), PartPlan::Insert);
        assert_eq!(
            plan(WeekendPart::Full8, 1, &held),
            PartPlan::Contest { candidates: vec![1] }
        );
    }

    #[test]
    fn full8_override_needs_capacity() {
        let claims = vec![claim(1, WeekendPart::Last4, 0)];
        assert_eq!(plan(WeekendPart::Full8, 0, &claims), PartPlan::NoRoom);
    }

    #[test]
    fn zero_capacity_has_no_room() {
        let none: Vec<Claim> = Vec::new();
        assert_eq!(plan(WeekendPart::Full8, 0, &none), PartPlan::NoRoom);
        assert_eq!(plan(WeekendPart::First4, 0, &none), PartPlan::NoRoom);
    }

    #[test]
    fn earliest_full8_wins_alone() {
        let claims = vec![
            claim(1, WeekendPart::First4, 0),
            claim(3, WeekendPart::Full8, 5),
            claim(2, WeekendPart::Full8, 2),
        ];
        let won: Vec<SignupId> = winners(&claims).iter().map(|c| c.id).collect();
        assert_eq!(won, vec![2]);
    }

    #[test]
    fn earliest_first_and_last_pair_wins() {
        let claims = vec![
            claim(1, WeekendPart::First4, 0),
            claim(2, WeekendPart::First4, 1),
            claim(3, WeekendPart::Last4, 2),
            claim(4, WeekendPart::Last4, 3),
        ];
        let won: Vec<SignupId> = winners(&claims).iter().map(|c| c.id).collect();
        assert_eq!(won, vec![1, 3]);
    }

    #[test]
    fn single_part_type_takes_two_earliest() {
        let claims = vec![
            claim(5, WeekendPart::Last4, 9),
            claim(4, WeekendPart::Last4, 1),
            claim(6, WeekendPart::Last4, 4),
        ];
        let won: Vec<SignupId> = winners(&claims).iter().map(|c| c.id).collect();
        assert_eq!(won, vec![4, 6]);
    }
}
