//! Mapping display names to stored fighters

use crate::data::Store;
use crate::{Fighter, FighterId, FighterUpdate, Result};

/// A display name split into the stored key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub given: String,
    pub family: String,
}

/// A slot whose stored fighter disagrees with the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConflict {
    /// Zero-based slot index
    pub slot: usize,
    pub recorded: FighterId,
    pub observed: FighterId,
}

/// Exact name-pair lookup of fighters; never merges near matches
pub struct IdentityResolver<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> IdentityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        IdentityResolver { store }
    }

    /// First whitespace token is the given name, the rest the family name
    pub fn split_name(full: &str) -> Option<PersonName> {
        let mut parts = full.split_whitespace();
        let given = parts.next()?.to_string();
        let family = parts.collect::<Vec<_>>().join(" ");
        Some(PersonName { given, family })
    }

    /// Look up the fighter with exactly this display name
    pub fn resolve(&self, full: &str) -> Result<Option<Fighter>> {
        match Self::split_name(full) {
            Some(name) => self.store.find_fighter(&name.given, &name.family),
            None => Ok(None),
        }
    }

    /// Look up a fighter, creating a bare record when the name is new
    pub fn resolve_or_create(&self, full: &str) -> Result<Option<Fighter>> {
        let Some(name) = Self::split_name(full) else {
            return Ok(None);
        };
        if let Some(fighter) = self.store.find_fighter(&name.given, &name.family)? {
            return Ok(Some(fighter));
        }
        log::debug!("Creating fighter {}", full.trim());
        let fighter = self
            .store
            .create_fighter(&name.given, &name.family, &FighterUpdate::default())?;
        Ok(Some(fighter))
    }
}

/// Merge the fighters seen on a page into a fight's stored slots
///
/// Empty slots are filled, preferring the slot the page used. An id already
/// stored in either slot is never repeated. When both slots are taken by
/// other fighters the stored id wins and the disagreement is reported.
pub fn reconcile_slots(
    recorded: [Option<FighterId>; 2],
    observed: [Option<FighterId>; 2],
) -> ([Option<FighterId>; 2], Vec<SlotConflict>) {
    let mut slots = recorded;
    let mut conflicts = Vec::new();

    for (i, seen) in observed.iter().enumerate() {
        let Some(seen) = *seen else { continue };
        if slots.contains(&Some(seen)) {
            continue;
        }
        let free = if slots[i].is_none() {
            Some(i)
        } else {
            slots.iter().position(Option::is_none)
        };
        match (free, slots[i]) {
            (Some(free), _) => slots[free] = Some(seen),
            (None, Some(stored)) => conflicts.push(SlotConflict {
                slot: i,
                recorded: stored,
                observed: seen,
            }),
            (None, None) => {}
        }
    }

    (slots, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;

    #[test]
    fn test_split_name() {
        let name = IdentityResolver::<Database>::split_name("Jon Jones").unwrap();
        assert_eq!(name.given, "Jon");
        assert_eq!(name.family, "Jones");

        let name = IdentityResolver::<Database>::split_name("  Antonio   Rodrigo  Nogueira ").unwrap();
        assert_eq!(name.given, "Antonio");
        assert_eq!(name.family, "Rodrigo Nogueira");

        let name = IdentityResolver::<Database>::split_name("Israel").unwrap();
        assert_eq!(name.family, "");

        assert_eq!(IdentityResolver::<Database>::split_name("   "), None);
    }

    #[test]
    fn test_resolve_is_exact() {
        let db = Database::in_memory().unwrap();
        let resolver = IdentityResolver::new(&db);

        assert!(resolver.resolve("Jon Jones").unwrap().is_none());
        let jon = resolver.resolve_or_create("Jon Jones").unwrap().unwrap();
        let again = resolver.resolve_or_create("Jon  Jones").unwrap().unwrap();
        assert_eq!(jon.id, again.id);

        let jonathan = resolver.resolve_or_create("Jonathan Jones").unwrap().unwrap();
        assert_ne!(jonathan.id, jon.id);
        assert!(resolver.resolve("jon jones").unwrap().is_none());
        assert!(resolver.resolve_or_create("").unwrap().is_none());

        assert_eq!(db.get_stats().unwrap().fighter_count, 2);
    }

    #[test]
    fn test_reconcile_fills_empty_slots() {
        let a = FighterId(1);
        let b = FighterId(2);

        let (slots, conflicts) = reconcile_slots([None, None], [Some(a), Some(b)]);
        assert_eq!(slots, [Some(a), Some(b)]);
        assert!(conflicts.is_empty());

        let (slots, conflicts) = reconcile_slots([None, Some(a)], [Some(a), Some(b)]);
        assert_eq!(slots, [Some(b), Some(a)]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_reconcile_swapped_order_is_not_a_conflict() {
        let a = FighterId(1);
        let b = FighterId(2);
        let (slots, conflicts) = reconcile_slots([Some(a), Some(b)], [Some(b), Some(a)]);
        assert_eq!(slots, [Some(a), Some(b)]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_reconcile_keeps_recorded_on_conflict() {
        let a = FighterId(1);
        let b = FighterId(2);
        let c = FighterId(3);
        let (slots, conflicts) = reconcile_slots([Some(a), Some(b)], [Some(a), Some(c)]);
        assert_eq!(slots, [Some(a), Some(b)]);
        assert_eq!(
            conflicts,
            vec![SlotConflict {
                slot: 1,
                recorded: b,
                observed: c,
            }]
        );
    }
}
