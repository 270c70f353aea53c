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

use log::{debug, trace};

use crate::cluster::{Cluster, ClusterType, ContactProfile};
use crate::rng::RandomStream;

/// The verbosity of the per-event log line emitted by the contact/transmission kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    None,
    Transmissions,
    Contacts,
}

impl std::str::FromStr for LogMode {
    type Err = crate::error::StrideError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(LogMode::None),
            "Transmissions" => Ok(LogMode::Transmissions),
            "Contacts" => Ok(LogMode::Contacts),
            other => Err(crate::error::StrideError::InvalidLogMode(other.to_string())),
        }
    }
}

fn rate_to_probability(rate: f64) -> f64 {
    1.0 - (-rate).exp()
}

/// One per-day dispatch selecting the kernel specialization for
/// `(log_mode, track_index_case)`, replacing the original's compile-time
/// template instantiation (spec §9 Design Notes).
pub struct Infector {
    pub log_mode: LogMode,
    pub track_index_case: bool,
}

/// A single observable event emitted by the kernel, for callers that want
/// to route it to both the `log` crate and the flat event-log file (§6).
pub enum Event {
    Transmission { infecter_id: u64, infected_id: u64, cluster_type: &'static str, day: u32 },
    Contact { p1_id: u64, p1_age: u32, p2_age: u32, flags: [bool; 5], day: u32 },
}

impl Infector {
    /// Runs one cluster through the kernel for the current simulation day.
    /// Returns the events emitted, for the caller to log/persist.
    pub fn execute(
        &self,
        cluster: &mut Cluster,
        profile: &ContactProfile,
        transmission_rate: f64,
        day: u32,
        rng: &mut RandomStream,
    ) -> Vec<Event> {
        match self.log_mode {
            LogMode::None | LogMode::Transmissions => self.execute_transmissions(cluster, profile, transmission_rate, day, rng),
            LogMode::Contacts => self.execute_contacts(cluster, profile, day, rng),
        }
    }

    fn execute_transmissions(
        &self,
        cluster: &mut Cluster,
        profile: &ContactProfile,
        transmission_rate: f64,
        day: u32,
        rng: &mut RandomStream,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let (any_infectious, num_cases) = cluster.sort_members();
        if !any_infectious {
            return events;
        }
        cluster.update_member_presence();

        let index_immune = cluster.index_immune();
        for i in 0..num_cases {
            let (infecter, infecter_present) = cluster.members()[i].clone();
            if !infecter_present || !infecter.health().is_infectious() {
                continue;
            }
            let contact_rate = cluster.contact_rate(infecter.age(), profile);

            for j in num_cases..index_immune {
                let (contact, contact_present) = cluster.members()[j].clone();
                if !contact_present {
                    continue;
                }
                let u = rng.next_double();
                if u < rate_to_probability(transmission_rate * contact_rate) {
                    if self.log_mode == LogMode::Transmissions {
                        trace!("[TRAN] {} {} {:?} {}", infecter.id(), contact.id(), cluster.cluster_type(), day);
                        events.push(Event::Transmission {
                            infecter_id: infecter.id(),
                            infected_id: contact.id(),
                            cluster_type: cluster_type_name(cluster),
                            day,
                        });
                    }
                    contact.health_mut().start_infection();
                    if self.track_index_case {
                        contact.health_mut().stop_infection();
                    }
                }
            }
        }
        events
    }

    fn execute_contacts(&self, cluster: &mut Cluster, profile: &ContactProfile, day: u32, rng: &mut RandomStream) -> Vec<Event> {
        let mut events = Vec::new();
        cluster.update_member_presence();
        let members = cluster.members().to_vec();

        for (i1, (p1, present1)) in members.iter().enumerate() {
            if !present1 || !p1.is_participating_in_survey() {
                continue;
            }
            let contact_rate = cluster.contact_rate(p1.age(), profile);
            for (i2, (p2, present2)) in members.iter().enumerate() {
                if i1 == i2 || !present2 {
                    continue;
                }
                let u = rng.next_double();
                if u < rate_to_probability(contact_rate) {
                    let cluster_type = cluster.cluster_type();
                    let flags = [
                        cluster_type == ClusterType::Household,
                        cluster_type == ClusterType::Work,
                        cluster_type == ClusterType::School,
                        cluster_type == ClusterType::PrimaryCommunity,
                        cluster_type == ClusterType::SecondaryCommunity,
                    ];
                    debug!("[CONT] {} {} {} {:?} {}", p1.id(), p1.age(), p2.age(), flags, day);
                    events.push(Event::Contact { p1_id: p1.id(), p1_age: p1.age(), p2_age: p2.age(), flags, day });
                }
            }
        }
        events
    }
}

fn cluster_type_name(cluster: &Cluster) -> &'static str {
    match cluster.cluster_type() {
        crate::cluster::ClusterType::Household => "Household",
        crate::cluster::ClusterType::School => "School",
        crate::cluster::ClusterType::Work => "Work",
        crate::cluster::ClusterType::PrimaryCommunity => "PrimaryCommunity",
        crate::cluster::ClusterType::SecondaryCommunity => "SecondaryCommunity",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterType;
    use crate::disease::Fate;
    use crate::person::{Gender, Person};

    fn fate() -> Fate {
        Fate { start_infectious: 0, end_infectious: 100, start_symptomatic: 200, end_symptomatic: 300 }
    }

    #[test]
    fn empty_cluster_produces_zero_transmissions() {
        let mut cluster = Cluster::new(1, ClusterType::Household);
        let profile = ContactProfile::uniform(4.0);
        let infector = Infector { log_mode: LogMode::None, track_index_case: false };
        let mut rng = RandomStream::new(1);
        let events = infector.execute(&mut cluster, &profile, 1.0, 0, &mut rng);
        assert!(events.is_empty());
    }

    #[test]
    fn no_infectious_member_produces_zero_transmissions() {
        let mut cluster = Cluster::new(1, ClusterType::Household);
        cluster.add_person(Person::new(1, 30, Gender::Male, fate()));
        cluster.add_person(Person::new(2, 30, Gender::Male, fate()));
        let profile = ContactProfile::uniform(4.0);
        let infector = Infector { log_mode: LogMode::None, track_index_case: false };
        let mut rng = RandomStream::new(1);
        let events = infector.execute(&mut cluster, &profile, 1.0, 0, &mut rng);
        assert!(events.is_empty());
    }

    #[test]
    fn track_index_case_stops_infection_immediately() {
        let mut cluster = Cluster::new(1, ClusterType::Household);
        let infecter = Person::new(1, 30, Gender::Male, fate());
        infecter.health_mut().start_infection();
        infecter.health_mut().update(); // -> Infectious (start_infectious = 0)
        cluster.add_person(infecter);
        cluster.add_person(Person::new(2, 30, Gender::Male, fate()));
        let profile = ContactProfile::uniform(1000.0); // near-certain transmission
        let infector = Infector { log_mode: LogMode::None, track_index_case: true };
        let mut rng = RandomStream::new(1);
        infector.execute(&mut cluster, &profile, 5.0, 0, &mut rng);
        let infected = cluster.members().iter().find(|(p, _)| p.id() == 2).unwrap();
        assert!(infected.0.health().is_recovered() || infected.0.health().is_susceptible());
    }
}
