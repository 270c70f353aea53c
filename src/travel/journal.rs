/*
 * EpiRust
 * Copyright (c) 2020  ThoughtWorks, Inc.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

//! Bookkeeping for people currently away from home, in either direction:
//! residents who left on a trip (`ExpatriateJournal`, kept in the home
//! region) and visitors who arrived from elsewhere (`VisitorJournal`, kept
//! in the host region). Grounded on the original's
//! `multiregion/VisitorJournal.h`/`multiregion/Visitor.h`.

use std::collections::HashMap;

use fnv::FnvHashMap;

use crate::person::{Person, PersonId};
use crate::travel::RegionId;

/// A visiting person together with where it came from and when it leaves.
/// `home_id` is the person's id back in `home_region`, distinct from
/// `person.id()` which is the locally-assigned id while visiting.
#[derive(Clone)]
pub struct Visitor {
    pub person: Person,
    pub home_id: PersonId,
    pub home_region: RegionId,
    pub return_day: u32,
}

/// Residents this region sent abroad, keyed by their home id so they can
/// be handed back to the population unchanged on return.
#[derive(Default)]
pub struct ExpatriateJournal {
    by_home_id: FnvHashMap<PersonId, Person>,
}

impl ExpatriateJournal {
    pub fn new() -> ExpatriateJournal {
        ExpatriateJournal { by_home_id: FnvHashMap::default() }
    }

    pub fn add(&mut self, person: Person) {
        self.by_home_id.insert(person.id(), person);
    }

    pub fn extract(&mut self, home_id: PersonId) -> Option<Person> {
        self.by_home_id.remove(&home_id)
    }

    pub fn len(&self) -> usize {
        self.by_home_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_home_id.is_empty()
    }
}

/// Visitors currently present in this region, keyed by the local id they
/// were assigned on arrival and indexed by their due-back day so
/// `extract(day)` can pull exactly the ones leaving today.
#[derive(Default)]
pub struct VisitorJournal {
    by_local_id: FnvHashMap<PersonId, Visitor>,
    by_return_day: HashMap<u32, Vec<PersonId>>,
}

impl VisitorJournal {
    pub fn new() -> VisitorJournal {
        VisitorJournal { by_local_id: FnvHashMap::default(), by_return_day: HashMap::new() }
    }

    pub fn add(&mut self, local_id: PersonId, visitor: Visitor, return_day: u32) {
        self.by_return_day.entry(return_day).or_default().push(local_id);
        self.by_local_id.insert(local_id, visitor);
    }

    /// Removes and returns every visitor due back on `return_day`, grouped
    /// by their home region.
    pub fn extract(&mut self, return_day: u32) -> HashMap<RegionId, Vec<(PersonId, Visitor)>> {
        let mut by_home_region: HashMap<RegionId, Vec<(PersonId, Visitor)>> = HashMap::new();
        if let Some(ids) = self.by_return_day.remove(&return_day) {
            for id in ids {
                if let Some(v) = self.by_local_id.remove(&id) {
                    by_home_region.entry(v.home_region).or_default().push((id, v));
                }
            }
        }
        by_home_region
    }

    pub fn is_visitor(&self, local_id: PersonId) -> bool {
        self.by_local_id.contains_key(&local_id)
    }

    pub fn visitor_count(&self) -> usize {
        self.by_local_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::Fate;
    use crate::person::Gender;

    fn fate() -> Fate {
        Fate { start_infectious: 2, end_infectious: 10, start_symptomatic: 3, end_symptomatic: 8 }
    }

    #[test]
    fn expatriate_journal_round_trips_by_home_id() {
        let mut journal = ExpatriateJournal::new();
        let p = Person::new(7, 30, Gender::Male, fate());
        journal.add(p);
        assert_eq!(journal.len(), 1);
        let back = journal.extract(7).unwrap();
        assert_eq!(back.id(), 7);
        assert!(journal.is_empty());
    }

    #[test]
    fn visitor_journal_extracts_grouped_by_home_region_on_return_day() {
        let mut journal = VisitorJournal::new();
        let p1 = Person::new(101, 30, Gender::Male, fate());
        let p2 = Person::new(102, 40, Gender::Male, fate());
        journal.add(101, Visitor { person: p1, home_id: 1, home_region: 0, return_day: 5 }, 5);
        journal.add(102, Visitor { person: p2, home_id: 2, home_region: 1, return_day: 5 }, 5);
        assert!(journal.is_visitor(101));
        assert_eq!(journal.visitor_count(), 2);

        let due = journal.extract(5);
        assert_eq!(due.len(), 2);
        assert!(due.contains_key(&0));
        assert!(due.contains_key(&1));
        assert_eq!(journal.visitor_count(), 0);
        assert!(!journal.is_visitor(101));
    }

    #[test]
    fn extract_on_a_day_with_nobody_due_returns_empty() {
        let mut journal = VisitorJournal::new();
        assert!(journal.extract(3).is_empty());
    }
}
