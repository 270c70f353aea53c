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

//! The per-region simulation engine. Grounded on `sim/Simulator.h/.cpp`:
//! `TimeStep`/`AcceptVisitors`/`ReturnVisitors`/`AddPersonToClusters`/
//! `RemovePersonFromClusters`/`GeneratePersonId`/`GenerateHousehold`/
//! `RecyclePersonId`/`RecycleHousehold`.

pub mod builder;
pub mod config;

use log::info;
use rayon::prelude::*;

use crate::calendar::{Calendar, DaysOffPolicy};
use crate::cluster::{Cluster, ClusterType, ContactProfile, NUM_CLUSTER_TYPES};
use crate::disease::health::Health;
use crate::disease::DiseaseConfig;
use crate::infector::{Event, Infector, LogMode};
use crate::person::{Person, PersonId};
use crate::population::Population;
use crate::rng::RandomStream;
use crate::travel::journal::{ExpatriateJournal, Visitor, VisitorJournal};
use crate::travel::{RegionId, RegionTravel};

/// A resident or visitor in transit between regions, carrying the health
/// snapshot that must move with them.
#[derive(Clone)]
pub struct OutgoingVisitor {
    pub person: Person,
    pub home_region: RegionId,
    pub destination_region: RegionId,
    pub return_day: u32,
}

/// A visitor heading home, to be reinserted into the population of
/// `home_region` by that region's own `TimeStep`. `person` carries the
/// home id (via `Person::with_id`), which is also `home_id` so the home
/// region can look the resident up in its expatriate journal without
/// relying on the (otherwise locally-assigned) `person.id()`.
#[derive(Clone)]
pub struct ReturningExpatriate {
    pub person: Person,
    pub home_id: PersonId,
    pub home_region: RegionId,
}

#[derive(Default)]
pub struct SimulationStepInput {
    pub visitors: Vec<OutgoingVisitor>,
    pub expatriates: Vec<ReturningExpatriate>,
}

#[derive(Default)]
pub struct SimulationStepOutput {
    pub outgoing_visitors: Vec<OutgoingVisitor>,
    pub returning_expatriates: Vec<ReturningExpatriate>,
}

/// The per-region epidemic engine: population, clusters, journals, rng
/// handlers and the disease/contact configuration needed to run one day
/// at a time.
pub struct Simulator {
    region_id: RegionId,
    num_days: u32,
    num_threads: usize,
    track_index_case: bool,
    log_mode: LogMode,
    days_off_policy: DaysOffPolicy,

    calendar: Calendar,
    population: Population,
    clusters: [Vec<Cluster>; NUM_CLUSTER_TYPES],
    contact_profiles: [ContactProfile; NUM_CLUSTER_TYPES],

    disease_config: DiseaseConfig,
    transmission_rate: f64,

    rng_handlers: Vec<RandomStream>,
    travel_rng: RandomStream,
    travel_model: Option<RegionTravel>,

    visitor_journal: VisitorJournal,
    expatriate_journal: ExpatriateJournal,

    free_person_ids: Vec<PersonId>,
    free_household_ids: Vec<u32>,

    last_day_events: Vec<Event>,
    cases_history: Vec<usize>,
}

impl Simulator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        region_id: RegionId,
        num_days: u32,
        num_threads: usize,
        track_index_case: bool,
        log_mode: LogMode,
        days_off_policy: DaysOffPolicy,
        calendar: Calendar,
        population: Population,
        clusters: [Vec<Cluster>; NUM_CLUSTER_TYPES],
        contact_profiles: [ContactProfile; NUM_CLUSTER_TYPES],
        disease_config: DiseaseConfig,
        transmission_rate: f64,
        rng_handlers: Vec<RandomStream>,
        travel_rng: RandomStream,
        travel_model: Option<RegionTravel>,
    ) -> Simulator {
        Simulator {
            region_id,
            num_days,
            num_threads,
            track_index_case,
            log_mode,
            days_off_policy,
            calendar,
            population,
            clusters,
            contact_profiles,
            disease_config,
            transmission_rate,
            rng_handlers,
            travel_rng,
            travel_model,
            visitor_journal: VisitorJournal::new(),
            expatriate_journal: ExpatriateJournal::new(),
            free_person_ids: Vec::new(),
            free_household_ids: Vec::new(),
            last_day_events: Vec::new(),
            cases_history: Vec::new(),
        }
    }

    pub fn region_id(&self) -> RegionId {
        self.region_id
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn transmission_rate(&self) -> f64 {
        self.transmission_rate
    }

    /// Removes and returns the events the contact/transmission phase
    /// emitted on the most recently completed day, for a caller that
    /// wants to persist them to the event log file (spec §6).
    pub fn take_last_day_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.last_day_events)
    }

    /// Cumulative infected count recorded after each day run so far, day 0
    /// first (spec §6 `<prefix>_cases.csv`).
    pub fn cases_history(&self) -> &[usize] {
        &self.cases_history
    }

    pub fn is_done(&self) -> bool {
        self.calendar.day() >= self.num_days
    }

    /// Regions whose visitors/expatriates this region must wait for before
    /// starting its next day, i.e. the regions that may send it travelers.
    pub fn incoming_route_source_regions(&self) -> std::collections::HashSet<RegionId> {
        self.travel_model
            .as_ref()
            .map(|m| m.regions_with_incoming_routes().clone())
            .unwrap_or_default()
    }

    /// Runs one simulated day: AcceptVisitors, DaysOff decision, person
    /// update, contact/transmission phase, AdvanceDay, ReturnVisitors.
    pub fn time_step(&mut self, input: SimulationStepInput) -> SimulationStepOutput {
        let today = self.calendar.day();
        self.last_day_events.clear();
        self.accept_visitors(input);

        let is_work_off = self.days_off_policy.is_work_off(&self.calendar);
        let is_school_off = self.days_off_policy.is_school_off(&self.calendar);

        self.population.parallel_for(self.num_threads, |person, _worker| {
            person.update(is_work_off, is_school_off);
        });

        self.run_contact_phase(today);
        self.cases_history.push(self.population.get_infected_count());

        self.calendar.advance_day();

        self.return_visitors(today)
    }

    fn accept_visitors(&mut self, input: SimulationStepInput) {
        for expatriate in input.expatriates {
            if let Some(local) = self.expatriate_journal.extract(expatriate.home_id) {
                *local.health_mut() = expatriate.person.health();
                if expatriate.person.is_participating_in_survey() {
                    local.participate_in_survey();
                }
                self.add_person_to_clusters(&local);
                self.population.insert(local);
            }
        }

        for visitor in input.visitors {
            let home_id = visitor.person.id();
            let local_id = self.generate_person_id();
            let household_id = self.generate_household_id();

            let incoming_health = visitor.person.health();
            let fresh_fate = self.disease_config.sample_fate(&mut self.travel_rng);
            let local_person = Person::new(local_id, visitor.person.age(), visitor.person.gender(), fresh_fate);
            *local_person.health_mut() =
                Health::with_status(fresh_fate, incoming_health.status(), incoming_health.days_infected());
            local_person.set_cluster_id(ClusterType::Household, household_id);
            local_person.set_cluster_id(ClusterType::Work, self.random_existing_cluster_id(ClusterType::Work));
            local_person.set_cluster_id(
                ClusterType::PrimaryCommunity,
                self.random_existing_cluster_id(ClusterType::PrimaryCommunity),
            );
            local_person.set_cluster_id(
                ClusterType::SecondaryCommunity,
                self.random_existing_cluster_id(ClusterType::SecondaryCommunity),
            );

            self.add_person_to_clusters(&local_person);
            self.population.insert(local_person.clone());
            self.visitor_journal.add(
                local_id,
                Visitor { person: local_person, home_id, home_region: visitor.home_region, return_day: visitor.return_day },
                visitor.return_day,
            );
        }
    }

    fn run_contact_phase(&mut self, today: u32) {
        let infector = Infector { log_mode: self.log_mode, track_index_case: self.track_index_case };
        let transmission_rate = self.transmission_rate;
        let num_threads = self.num_threads.max(1);

        for cluster_type in ClusterType::ALL {
            let profile = self.contact_profiles[cluster_type.index()].clone();
            let rng_handlers = &mut self.rng_handlers;
            let clusters = &mut self.clusters[cluster_type.index()];
            let num_clusters = clusters.len();
            let chunk_size = ((num_clusters + num_threads - 1) / num_threads).max(1);

            let events: Vec<Event> = clusters
                .par_chunks_mut(chunk_size)
                .zip(rng_handlers.par_iter_mut())
                .flat_map(|(chunk, rng)| {
                    let mut local_events = Vec::new();
                    for cluster in chunk.iter_mut() {
                        local_events.extend(infector.execute(cluster, &profile, transmission_rate, today, rng));
                    }
                    local_events
                })
                .collect();

            if !events.is_empty() {
                info!("{:?}: {} events in {} clusters", cluster_type, events.len(), num_clusters);
                self.last_day_events.extend(events);
            }
        }
    }

    fn return_visitors(&mut self, today: u32) -> SimulationStepOutput {
        let mut output = SimulationStepOutput::default();

        for (_home_region, visitors) in self.visitor_journal.extract(today) {
            for (local_id, visitor) in visitors {
                if let Some(person) = self.population.extract(local_id) {
                    self.remove_person_from_clusters(&person);
                    self.recycle_person_id(local_id);
                    self.recycle_household_id(person.cluster_id(ClusterType::Household));
                    output.returning_expatriates.push(ReturningExpatriate {
                        person: person.with_id(visitor.home_id),
                        home_id: visitor.home_id,
                        home_region: visitor.home_region,
                    });
                }
            }
        }

        if let Some(model) = &self.travel_model {
            if let Some((regions, Ok(sampler))) = model.destination_distribution() {
                let visitor_count = self.visitor_journal.visitor_count();
                let pop_size = self.population.size();
                let travel_count = ((pop_size.saturating_sub(visitor_count)) as f64 * model.travel_fraction()).floor() as usize;

                if travel_count > 0 {
                    let visitor_journal = &self.visitor_journal;
                    if let Ok(travelers) = self.population.get_random_persons_matching(&mut self.travel_rng, travel_count, |p| {
                        !visitor_journal.is_visitor(p.id())
                    }) {
                        for traveler in travelers {
                            let destination_index = sampler.next(&mut self.travel_rng);
                            let destination_region = regions[destination_index];
                            let return_day =
                                today + self.travel_rng.next_uint((model.max_duration() - model.min_duration()) as u32)
                                    + model.min_duration();

                            if let Some(person) = self.population.extract(traveler.id()) {
                                self.remove_person_from_clusters(&person);
                                self.expatriate_journal.add(person.clone());
                                output.outgoing_visitors.push(OutgoingVisitor {
                                    person,
                                    home_region: self.region_id,
                                    destination_region,
                                    return_day,
                                });
                            }
                        }
                    }
                }
            }
        }

        output
    }

    fn add_person_to_clusters(&mut self, person: &Person) {
        for cluster_type in ClusterType::ALL {
            let id = person.cluster_id(cluster_type);
            if id == 0 {
                continue;
            }
            if let Some(cluster) = self.clusters[cluster_type.index()].get_mut(id as usize) {
                cluster.add_person(person.clone());
            }
        }
    }

    fn remove_person_from_clusters(&mut self, person: &Person) {
        for cluster_type in ClusterType::ALL {
            let id = person.cluster_id(cluster_type);
            if id == 0 {
                continue;
            }
            if let Some(cluster) = self.clusters[cluster_type.index()].get_mut(id as usize) {
                cluster.remove_person(person);
            }
        }
    }

    fn generate_person_id(&mut self) -> PersonId {
        self.free_person_ids.pop().unwrap_or_else(|| {
            let next = self.population.max_id() + 1;
            next
        })
    }

    fn recycle_person_id(&mut self, id: PersonId) {
        self.free_person_ids.push(id);
    }

    fn generate_household_id(&mut self) -> u32 {
        self.free_household_ids.pop().unwrap_or_else(|| {
            let households = &mut self.clusters[ClusterType::Household.index()];
            let new_id = households.len() as u32;
            households.push(Cluster::new(new_id, ClusterType::Household));
            new_id
        })
    }

    fn recycle_household_id(&mut self, id: u32) {
        if id != 0 {
            self.free_household_ids.push(id);
        }
    }

    fn random_existing_cluster_id(&mut self, cluster_type: ClusterType) -> u32 {
        let max_id = self.clusters[cluster_type.index()].len().saturating_sub(1).max(1) as u32;
        1 + self.travel_rng.next_uint(max_id - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::cluster::ContactProfile;
    use crate::disease::CumulativeDist;

    fn empty_clusters() -> [Vec<Cluster>; NUM_CLUSTER_TYPES] {
        ClusterType::ALL.map(|ct| vec![Cluster::new(0, ct)])
    }

    fn profiles() -> [ContactProfile; NUM_CLUSTER_TYPES] {
        ClusterType::ALL.map(|_| ContactProfile::uniform(1.0))
    }

    fn disease_config() -> DiseaseConfig {
        DiseaseConfig {
            start_infectiousness: CumulativeDist::new(vec![1.0]),
            start_symptomatic: CumulativeDist::new(vec![1.0]),
            time_infectious: CumulativeDist::new(vec![1.0]),
            time_symptomatic: CumulativeDist::new(vec![1.0]),
            b0: 0.0,
            b1: 1.0,
        }
    }

    fn simulator(num_days: u32) -> Simulator {
        Simulator::new(
            0,
            num_days,
            1,
            false,
            LogMode::None,
            DaysOffPolicy::Standard,
            Calendar::without_holidays(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            Population::new(),
            empty_clusters(),
            profiles(),
            disease_config(),
            1.0,
            vec![RandomStream::new(1)],
            RandomStream::new(2),
            None,
        )
    }

    #[test]
    fn is_done_once_calendar_reaches_num_days() {
        let mut sim = simulator(2);
        assert!(!sim.is_done());
        sim.calendar.advance_day();
        sim.calendar.advance_day();
        assert!(sim.is_done());
    }

    #[test]
    fn time_step_with_empty_population_produces_no_travelers() {
        let mut sim = simulator(5);
        let output = sim.time_step(SimulationStepInput::default());
        assert!(output.outgoing_visitors.is_empty());
        assert!(output.returning_expatriates.is_empty());
        assert_eq!(sim.calendar().day(), 1);
    }

    #[test]
    fn cases_history_records_one_entry_per_day_run() {
        let mut sim = simulator(3);
        sim.time_step(SimulationStepInput::default());
        sim.time_step(SimulationStepInput::default());
        assert_eq!(sim.cases_history().len(), 2);
        assert_eq!(sim.cases_history(), &[0, 0]);
    }

    #[test]
    fn incoming_route_source_regions_empty_without_travel_model() {
        let sim = simulator(1);
        assert!(sim.incoming_route_source_regions().is_empty());
    }
}
