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

//! A `Person` is a cheap, `Clone`-able handle onto shared, mutably-locked
//! person data. The original engine's `GenericPerson` wraps a
//! `shared_ptr<GenericPersonData>`, so copies placed in `Cluster` member
//! lists and copies held by `Population` alias the same underlying record;
//! mutating a person through one handle is visible through every other.
//! `Arc<Mutex<_>>` is the thread-safe Rust analogue, safe here because
//! spec §5 guarantees a person is never touched by two workers at once
//! (cluster-type phases are barriers, and within a phase a person sits in
//! exactly one cluster of that type).

use std::sync::{Arc, Mutex, MutexGuard};

use crate::cluster::ClusterType;
use crate::disease::health::Health;
use crate::disease::Fate;

pub type PersonId = u64;

pub const MAXIMUM_AGE: u32 = 80;
pub const MIN_ADULT_AGE: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

/// Cluster id per cluster type; 0 means "not a member of any cluster of this type".
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterMembership {
    pub household: u32,
    pub school: u32,
    pub work: u32,
    pub primary_community: u32,
    pub secondary_community: u32,
}

impl ClusterMembership {
    pub fn get(&self, cluster_type: ClusterType) -> u32 {
        match cluster_type {
            ClusterType::Household => self.household,
            ClusterType::School => self.school,
            ClusterType::Work => self.work,
            ClusterType::PrimaryCommunity => self.primary_community,
            ClusterType::SecondaryCommunity => self.secondary_community,
        }
    }

    pub fn set(&mut self, cluster_type: ClusterType, id: u32) {
        match cluster_type {
            ClusterType::Household => self.household = id,
            ClusterType::School => self.school = id,
            ClusterType::Work => self.work = id,
            ClusterType::PrimaryCommunity => self.primary_community = id,
            ClusterType::SecondaryCommunity => self.secondary_community = id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Presence {
    household: bool,
    school: bool,
    work: bool,
    primary_community: bool,
    secondary_community: bool,
}

impl Presence {
    fn get(&self, cluster_type: ClusterType) -> bool {
        match cluster_type {
            ClusterType::Household => self.household,
            ClusterType::School => self.school,
            ClusterType::Work => self.work,
            ClusterType::PrimaryCommunity => self.primary_community,
            ClusterType::SecondaryCommunity => self.secondary_community,
        }
    }
}

struct PersonData {
    age: u32,
    gender: Gender,
    clusters: ClusterMembership,
    presence: Presence,
    health: Health,
    is_participant: bool,
}

/// Identity, demographics, cluster memberships, presence flags and health
/// for one person. Equality is by id alone.
#[derive(Clone)]
pub struct Person {
    id: PersonId,
    data: Arc<Mutex<PersonData>>,
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Person {}

impl Person {
    pub fn new(id: PersonId, age: u32, gender: Gender, fate: Fate) -> Person {
        Person {
            id,
            data: Arc::new(Mutex::new(PersonData {
                age,
                gender,
                clusters: ClusterMembership::default(),
                presence: Presence { household: true, school: true, work: true, primary_community: true, secondary_community: true },
                health: Health::new(fate),
                is_participant: false,
            })),
        }
    }

    pub fn with_clusters(id: PersonId, age: u32, gender: Gender, fate: Fate, clusters: ClusterMembership) -> Person {
        let p = Person::new(id, age, gender, fate);
        p.data.lock().unwrap().clusters = clusters;
        p
    }

    fn lock(&self) -> MutexGuard<'_, PersonData> {
        self.data.lock().unwrap()
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    /// Returns a handle to the same underlying record but with a different
    /// id — used when a visitor or returning expatriate gets a fresh local
    /// id while its health/demographics are otherwise copied.
    pub fn with_id(&self, new_id: PersonId) -> Person {
        let snapshot = self.lock();
        Person {
            id: new_id,
            data: Arc::new(Mutex::new(PersonData {
                age: snapshot.age,
                gender: snapshot.gender,
                clusters: snapshot.clusters,
                presence: snapshot.presence,
                health: snapshot.health,
                is_participant: snapshot.is_participant,
            })),
        }
    }

    pub fn age(&self) -> u32 {
        self.lock().age
    }

    pub fn gender(&self) -> Gender {
        self.lock().gender
    }

    pub fn cluster_id(&self, cluster_type: ClusterType) -> u32 {
        self.lock().clusters.get(cluster_type)
    }

    pub fn set_cluster_id(&self, cluster_type: ClusterType, id: u32) {
        self.lock().clusters.set(cluster_type, id);
    }

    pub fn clusters(&self) -> ClusterMembership {
        self.lock().clusters
    }

    pub fn is_in_cluster(&self, cluster_type: ClusterType) -> bool {
        self.lock().presence.get(cluster_type)
    }

    pub fn health(&self) -> Health {
        self.lock().health
    }

    pub fn health_mut(&self) -> HealthHandle<'_> {
        HealthHandle { guard: self.lock() }
    }

    pub fn is_participating_in_survey(&self) -> bool {
        self.lock().is_participant
    }

    pub fn participate_in_survey(&self) {
        self.lock().is_participant = true;
    }

    /// Advances health one day and recomputes presence per spec §4.D:
    /// `is_work_off || (age <= MIN_ADULT_AGE && is_school_off)` sends the
    /// person to the primary community instead of school/work/secondary.
    pub fn update(&self, is_work_off: bool, is_school_off: bool) {
        let mut data = self.lock();
        data.health.update();
        if is_work_off || (data.age <= MIN_ADULT_AGE && is_school_off) {
            data.presence = Presence {
                household: true,
                school: false,
                work: false,
                primary_community: true,
                secondary_community: false,
            };
        } else {
            data.presence = Presence {
                household: true,
                school: true,
                work: true,
                primary_community: false,
                secondary_community: true,
            };
        }
    }
}

/// A short-lived mutable borrow of a person's health, used both for direct
/// mutation (builder/tests) and, via `&mut Health`, by the Infector kernel.
pub struct HealthHandle<'a> {
    guard: MutexGuard<'a, PersonData>,
}

impl<'a> std::ops::Deref for HealthHandle<'a> {
    type Target = Health;
    fn deref(&self) -> &Health {
        &self.guard.health
    }
}

impl<'a> std::ops::DerefMut for HealthHandle<'a> {
    fn deref_mut(&mut self) -> &mut Health {
        &mut self.guard.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fate() -> Fate {
        Fate { start_infectious: 2, end_infectious: 10, start_symptomatic: 3, end_symptomatic: 8 }
    }

    #[test]
    fn identity_equality_is_by_id() {
        let a = Person::new(1, 30, Gender::Male, fate());
        let b = Person::new(1, 99, Gender::Female, fate());
        let c = Person::new(2, 30, Gender::Male, fate());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_shares_underlying_record() {
        let a = Person::new(1, 30, Gender::Male, fate());
        let b = a.clone();
        a.health_mut().start_infection();
        assert!(b.health().is_infected());
    }

    #[test]
    fn with_id_copies_snapshot_but_not_identity() {
        let a = Person::new(1, 30, Gender::Male, fate());
        a.health_mut().start_infection();
        let b = a.with_id(2);
        assert_eq!(b.id(), 2);
        assert!(b.health().is_infected());
        // now independent: mutating a must not affect b.
        a.health_mut().stop_infection();
        assert!(b.health().is_infected());
    }

    #[test]
    fn update_sends_minors_to_primary_community_when_school_off() {
        let p = Person::new(1, 10, Gender::Male, fate());
        p.update(false, true);
        assert!(!p.is_in_cluster(ClusterType::School));
        assert!(!p.is_in_cluster(ClusterType::Work));
        assert!(p.is_in_cluster(ClusterType::PrimaryCommunity));
        assert!(!p.is_in_cluster(ClusterType::SecondaryCommunity));
    }

    #[test]
    fn update_keeps_adults_in_normal_clusters_on_a_working_day() {
        let p = Person::new(1, 40, Gender::Male, fate());
        p.update(false, false);
        assert!(p.is_in_cluster(ClusterType::School));
        assert!(p.is_in_cluster(ClusterType::Work));
        assert!(!p.is_in_cluster(ClusterType::PrimaryCommunity));
        assert!(p.is_in_cluster(ClusterType::SecondaryCommunity));
    }
}
