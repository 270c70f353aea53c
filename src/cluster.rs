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

use serde::Deserialize;

use crate::person::{Person, MAXIMUM_AGE};

pub const NUM_CLUSTER_TYPES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClusterType {
    Household,
    School,
    Work,
    PrimaryCommunity,
    SecondaryCommunity,
}

impl ClusterType {
    pub const ALL: [ClusterType; NUM_CLUSTER_TYPES] = [
        ClusterType::Household,
        ClusterType::School,
        ClusterType::Work,
        ClusterType::PrimaryCommunity,
        ClusterType::SecondaryCommunity,
    ];

    pub fn index(&self) -> usize {
        match self {
            ClusterType::Household => 0,
            ClusterType::School => 1,
            ClusterType::Work => 2,
            ClusterType::PrimaryCommunity => 3,
            ClusterType::SecondaryCommunity => 4,
        }
    }
}

/// Mean contacts per day in a given cluster type, indexed by effective age
/// (capped at `MAXIMUM_AGE`).
#[derive(Debug, Clone)]
pub struct ContactProfile {
    by_age: Vec<f64>,
}

impl ContactProfile {
    pub fn new(by_age: Vec<f64>) -> ContactProfile {
        assert_eq!(by_age.len(), MAXIMUM_AGE as usize + 1, "contact profile must cover ages 0..=MAXIMUM_AGE");
        ContactProfile { by_age }
    }

    pub fn uniform(rate: f64) -> ContactProfile {
        ContactProfile { by_age: vec![rate; MAXIMUM_AGE as usize + 1] }
    }

    pub fn mean_contacts(&self, age: u32) -> f64 {
        let effective = age.min(MAXIMUM_AGE) as usize;
        self.by_age[effective]
    }
}

/// A typed container of members, partitioned into `[0,num_cases)` cases,
/// `[num_cases,index_immune)` susceptible, `[index_immune,end)` immune.
pub struct Cluster {
    cluster_id: u32,
    cluster_type: ClusterType,
    members: Vec<(Person, bool)>,
    index_immune: usize,
}

impl Cluster {
    pub fn new(cluster_id: u32, cluster_type: ClusterType) -> Cluster {
        Cluster { cluster_id, cluster_type, members: Vec::new(), index_immune: 0 }
    }

    pub fn id(&self) -> u32 {
        self.cluster_id
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[(Person, bool)] {
        &self.members
    }

    pub fn index_immune(&self) -> usize {
        self.index_immune
    }

    /// Inserts `p`, preserving the three-way partition.
    pub fn add_person(&mut self, p: Person) {
        let present = p.is_in_cluster(self.cluster_type);
        if p.health().is_immune() {
            self.members.push((p, present));
        } else {
            self.members.insert(self.index_immune, (p, present));
            self.index_immune += 1;
        }
    }

    /// Removes `p` by id. If the erased position was within the non-immune
    /// prefix, `index_immune` shrinks by one.
    pub fn remove_person(&mut self, p: &Person) {
        if let Some(pos) = self.members.iter().position(|(m, _)| m.id() == p.id()) {
            self.members.remove(pos);
            if pos < self.index_immune {
                self.index_immune -= 1;
            }
        }
    }

    /// Re-establishes the three-way partition and reports whether any
    /// infectious case is present, plus the new `num_cases`.
    pub fn sort_members(&mut self) -> (bool, usize) {
        let mut infectious_cases = false;
        let mut num_cases = 0usize;

        let mut i_member = 0usize;
        while i_member < self.index_immune {
            if self.members[i_member].0.health().is_immune() {
                let mut new_place = self.index_immune - 1;
                self.index_immune -= 1;
                let mut swapped = false;
                while !swapped && new_place > i_member {
                    if self.members[new_place].0.health().is_immune() {
                        self.index_immune -= 1;
                        new_place -= 1;
                    } else {
                        self.members.swap(i_member, new_place);
                        swapped = true;
                    }
                }
            } else if !self.members[i_member].0.health().is_susceptible() {
                if !infectious_cases && self.members[i_member].0.health().is_infectious() {
                    infectious_cases = true;
                }
                if i_member > num_cases {
                    self.members.swap(i_member, num_cases);
                }
                num_cases += 1;
                i_member += 1;
            } else {
                i_member += 1;
            }
        }

        (infectious_cases, num_cases)
    }

    /// Refreshes the cached `present_today` flag for every member from the
    /// person's current presence-in-this-cluster-type flag.
    pub fn update_member_presence(&mut self) {
        let cluster_type = self.cluster_type;
        for (person, present) in &mut self.members {
            *present = person.is_in_cluster(cluster_type);
        }
    }

    /// Per-person contact rate inside this cluster, for an infectious
    /// person of the given age.
    pub fn contact_rate(&self, age: u32, profile: &ContactProfile) -> f64 {
        profile.mean_contacts(age) / self.members.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::health::Health;
    use crate::disease::Fate;
    use crate::person::{Gender, Person};

    fn person(id: u64, immune: bool) -> Person {
        let fate = Fate { start_infectious: 2, end_infectious: 10, start_symptomatic: 3, end_symptomatic: 8 };
        let p = Person::new(id, 30, Gender::Male, fate);
        if immune {
            p.health_mut().set_immune();
        }
        p
    }

    #[test]
    fn add_then_remove_leaves_size_and_index_immune_unchanged() {
        let mut c = Cluster::new(1, ClusterType::Household);
        let p = person(1, false);
        c.add_person(p.clone());
        let (size_before, idx_before) = (c.len(), c.index_immune());
        c.remove_person(&p);
        assert_eq!(c.len(), size_before - 1);
        c.add_person(p.clone());
        assert_eq!(c.len(), size_before);
        assert_eq!(c.index_immune(), idx_before);
    }

    #[test]
    fn immune_members_go_to_back_without_moving_index_immune() {
        let mut c = Cluster::new(1, ClusterType::Household);
        c.add_person(person(1, false));
        let before = c.index_immune();
        c.add_person(person(2, true));
        assert_eq!(c.index_immune(), before);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn sort_members_partitions_cases_susceptible_immune() {
        let mut c = Cluster::new(1, ClusterType::Household);
        let case = person(1, false);
        case.health_mut().start_infection();
        c.add_person(case);
        c.add_person(person(2, false)); // susceptible
        c.add_person(person(3, true)); // immune

        let (_, num_cases) = c.sort_members();
        assert_eq!(num_cases, 1);
        assert!(c.members()[0].0.health().is_case());
        assert_eq!(c.index_immune(), 2);
    }

    #[test]
    fn sort_members_is_idempotent() {
        let mut c = Cluster::new(1, ClusterType::Household);
        let case = person(1, false);
        case.health_mut().start_infection();
        c.add_person(case);
        c.add_person(person(2, false));

        let first = c.sort_members();
        let second = c.sort_members();
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn contact_rate_divides_profile_by_size() {
        let mut c = Cluster::new(1, ClusterType::Household);
        c.add_person(person(1, false));
        c.add_person(person(2, false));
        let profile = ContactProfile::uniform(4.0);
        assert_eq!(c.contact_rate(30, &profile), 2.0);
    }
}
