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

//! The dependency-driven multi-region scheduler (spec §4.K). Grounded on
//! `multiregion/SequentialSimulationManager.h`'s `TaskCommunicationBuffer` /
//! `TaskCommunicationData`, and `multiregion/ParallelSimulationManager.h`
//! for the thread-per-region variant.
//!
//! A region is *ready* once every region that may send it visitors has
//! published its step output for the phase the region is about to pull.
//! `push` distributes a region's outgoing visitors/expatriates into the
//! right destination buffers and satisfies the pushing region's
//! dependents; `pull` removes and returns the accumulated input for the
//! caller's current phase.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};

use log::info;

use crate::sim::{SimulationStepInput, SimulationStepOutput, Simulator};
use crate::travel::RegionId;

/// One region's communication buffer: its next phase to pull, the
/// accumulated input for each not-yet-pulled phase, and the set of
/// dependency regions it is still waiting on for the current phase.
struct CommunicationBuffer {
    phase: u32,
    pull_buffers: HashMap<u32, SimulationStepInput>,
    pending_dependencies: HashSet<RegionId>,
}

impl CommunicationBuffer {
    fn new(dependencies: HashSet<RegionId>) -> CommunicationBuffer {
        CommunicationBuffer { phase: 0, pull_buffers: HashMap::new(), pending_dependencies: dependencies }
    }

    fn is_ready(&self) -> bool {
        self.pending_dependencies.is_empty()
    }

    fn satisfy(&mut self, dependency: RegionId) {
        self.pending_dependencies.remove(&dependency);
    }

    fn pull(&mut self) -> SimulationStepInput {
        let input = self.pull_buffers.remove(&self.phase).unwrap_or_default();
        self.phase += 1;
        input
    }

    fn push_visitor(&mut self, source_phase: u32, visitor: crate::sim::OutgoingVisitor) {
        self.pull_buffers.entry(source_phase).or_default().visitors.push(visitor);
    }

    fn push_expatriate(&mut self, source_phase: u32, expatriate: crate::sim::ReturningExpatriate) {
        self.pull_buffers.entry(source_phase).or_default().expatriates.push(expatriate);
    }
}

/// Shared scheduling state for every region in one multi-region run: each
/// region's communication buffer plus the set of currently-ready regions.
struct SchedulerState {
    buffers: HashMap<RegionId, CommunicationBuffer>,
    ready: HashSet<RegionId>,
}

impl SchedulerState {
    /// Publishes `output` for `region_id` (currently at the phase it is
    /// about to advance past), distributing visitors/expatriates to their
    /// destinations and running the dependency accounting of spec §4.K:
    /// for each of `region_id`'s dependents, satisfy the dependency and
    /// mark it ready if that empties its pending set; then reinstate
    /// `region_id`'s own dependencies for its new phase and check whether
    /// it is immediately ready again.
    fn push(&mut self, region_id: RegionId, dependents: &HashSet<RegionId>, output: SimulationStepOutput) {
        let source_phase = self.buffers[&region_id].phase;

        for visitor in output.outgoing_visitors {
            let destination = visitor.destination_region;
            if let Some(buf) = self.buffers.get_mut(&destination) {
                buf.push_visitor(source_phase, visitor);
            }
        }
        for expatriate in output.returning_expatriates {
            let home = expatriate.home_region;
            if let Some(buf) = self.buffers.get_mut(&home) {
                buf.push_expatriate(source_phase, expatriate);
            }
        }

        for &dependent in dependents {
            if let Some(buf) = self.buffers.get_mut(&dependent) {
                buf.satisfy(region_id);
                if buf.is_ready() {
                    self.ready.insert(dependent);
                }
            }
        }
    }

    fn reset_dependencies(&mut self, region_id: RegionId, dependencies: HashSet<RegionId>) {
        if let Some(buf) = self.buffers.get_mut(&region_id) {
            let now_ready = dependencies.is_empty();
            buf.pending_dependencies = dependencies;
            if now_ready {
                self.ready.insert(region_id);
            }
        }
    }

    fn try_pop_ready(&mut self) -> Option<RegionId> {
        let id = *self.ready.iter().next()?;
        self.ready.remove(&id);
        Some(id)
    }
}

/// Runs every region to completion in a single thread, one ready region at
/// a time. Grounded on `SequentialSimulationManager::WaitAll`.
pub struct SequentialScheduler {
    regions: HashMap<RegionId, Simulator>,
    dependents: HashMap<RegionId, HashSet<RegionId>>,
    state: SchedulerState,
}

impl SequentialScheduler {
    /// Builds the scheduler from a set of already-constructed region
    /// simulators. Each region's dependency set is the set of regions
    /// that may send it visitors (its incoming-route source regions);
    /// the *dependents* of a region `R` are the regions that depend on
    /// `R`, i.e. every region for which `R` is an incoming-route source.
    pub fn new(regions: Vec<Simulator>) -> SequentialScheduler {
        let dependencies: HashMap<RegionId, HashSet<RegionId>> =
            regions.iter().map(|r| (r.region_id(), r.incoming_route_source_regions())).collect();

        let mut dependents: HashMap<RegionId, HashSet<RegionId>> =
            dependencies.keys().map(|&id| (id, HashSet::new())).collect();
        for (&region_id, deps) in &dependencies {
            for &dep in deps {
                dependents.entry(dep).or_default().insert(region_id);
            }
        }

        let mut buffers = HashMap::new();
        let mut ready = HashSet::new();
        for (&region_id, deps) in &dependencies {
            ready.insert(region_id); // phase 0 has no prerequisites
            buffers.insert(region_id, CommunicationBuffer::new(deps.clone()));
        }

        SequentialScheduler {
            regions: regions.into_iter().map(|r| (r.region_id(), r)).collect(),
            dependents,
            state: SchedulerState { buffers, ready },
        }
    }

    /// Runs every region's `TimeStep`s until every region reports done.
    /// Single-threaded: pops a ready region, steps it once, publishes its
    /// output, and repeats until no region is ready. `on_day` is invoked
    /// with the stepped region right after each `TimeStep`, so a caller
    /// can drain that day's events or checkpoint progress before the
    /// region's state moves on.
    pub fn run_to_completion(&mut self, mut on_day: impl FnMut(&mut Simulator)) {
        loop {
            let region_id = match self.state.try_pop_ready() {
                Some(id) => id,
                None => break,
            };

            let region = match self.regions.get_mut(&region_id) {
                Some(r) => r,
                None => continue,
            };
            if region.is_done() {
                continue;
            }

            let input = self.state.buffers.get_mut(&region_id).unwrap().pull();
            let output = region.time_step(input);
            info!("region {} completed day {}", region_id, region.calendar().day());
            on_day(region);

            let dependents = self.dependents.get(&region_id).cloned().unwrap_or_default();
            let dependencies = region.incoming_route_source_regions();
            self.state.push(region_id, &dependents, output);
            self.state.reset_dependencies(region_id, dependencies);
        }
    }

    pub fn regions(&self) -> impl Iterator<Item = &Simulator> {
        self.regions.values()
    }

    pub fn region(&self, region_id: RegionId) -> Option<&Simulator> {
        self.regions.get(&region_id)
    }
}

/// Thread-per-region variant: each region task owns a worker thread that
/// repeatedly pulls, steps, and pushes; scheduler state is shared behind a
/// mutex, with a condvar waking sleeping regions whenever any region
/// publishes output. Grounded on `ParallelSimulationManager`.
pub struct ParallelScheduler {
    regions: Vec<Simulator>,
    dependents: HashMap<RegionId, HashSet<RegionId>>,
}

struct SharedState {
    state: Mutex<SchedulerState>,
    condvar: Condvar,
}

impl ParallelScheduler {
    pub fn new(regions: Vec<Simulator>) -> ParallelScheduler {
        let dependencies: HashMap<RegionId, HashSet<RegionId>> =
            regions.iter().map(|r| (r.region_id(), r.incoming_route_source_regions())).collect();
        let mut dependents: HashMap<RegionId, HashSet<RegionId>> =
            dependencies.keys().map(|&id| (id, HashSet::new())).collect();
        for (&region_id, deps) in &dependencies {
            for &dep in deps {
                dependents.entry(dep).or_default().insert(region_id);
            }
        }
        ParallelScheduler { regions, dependents }
    }

    /// Spawns one worker thread per region and waits for all of them to
    /// finish. Each worker blocks on the shared condvar whenever its
    /// region is not ready, instead of busy-polling.
    pub fn run_to_completion(self) -> Vec<Simulator> {
        let region_ids: Vec<RegionId> = self.regions.iter().map(|r| r.region_id()).collect();
        let dependencies: HashMap<RegionId, HashSet<RegionId>> =
            self.regions.iter().map(|r| (r.region_id(), r.incoming_route_source_regions())).collect();

        let mut buffers = HashMap::new();
        let mut ready = HashSet::new();
        for &id in &region_ids {
            ready.insert(id);
            buffers.insert(id, CommunicationBuffer::new(dependencies[&id].clone()));
        }
        let shared = Arc::new(SharedState { state: Mutex::new(SchedulerState { buffers, ready }), condvar: Condvar::new() });

        let dependents = Arc::new(self.dependents);
        let simulators: HashMap<RegionId, Mutex<Simulator>> =
            self.regions.into_iter().map(|r| (r.region_id(), Mutex::new(r))).collect();
        let simulators = Arc::new(simulators);

        std::thread::scope(|scope| {
            for &region_id in &region_ids {
                let shared = Arc::clone(&shared);
                let dependents = Arc::clone(&dependents);
                let simulators = Arc::clone(&simulators);
                scope.spawn(move || {
                    Self::run_region(region_id, shared, dependents, simulators);
                });
            }
        });

        let simulators = Arc::try_unwrap(simulators).unwrap_or_else(|_| panic!("region threads still hold references"));
        let mut out: Vec<Simulator> = simulators.into_iter().map(|(_, m)| m.into_inner().unwrap()).collect();
        out.sort_by_key(|s| s.region_id());
        out
    }

    fn run_region(
        region_id: RegionId,
        shared: Arc<SharedState>,
        dependents: Arc<HashMap<RegionId, HashSet<RegionId>>>,
        simulators: Arc<HashMap<RegionId, Mutex<Simulator>>>,
    ) {
        loop {
            let is_done = { simulators[&region_id].lock().unwrap().is_done() };
            if is_done {
                break;
            }

            let input = {
                let mut guard = shared.state.lock().unwrap();
                while !guard.buffers[&region_id].is_ready() {
                    guard = shared.condvar.wait(guard).unwrap();
                }
                let input = guard.buffers.get_mut(&region_id).unwrap().pull();
                input
            };

            let (output, dependencies) = {
                let mut sim = simulators[&region_id].lock().unwrap();
                let output = sim.time_step(input);
                let dependencies = sim.incoming_route_source_regions();
                (output, dependencies)
            };

            {
                let mut guard = shared.state.lock().unwrap();
                let region_dependents = dependents.get(&region_id).cloned().unwrap_or_default();
                guard.push(region_id, &region_dependents, output);
                guard.reset_dependencies(region_id, dependencies);
                shared.condvar.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::cluster::{Cluster, ClusterType, ContactProfile, NUM_CLUSTER_TYPES};
    use crate::disease::{CumulativeDist, DiseaseConfig};
    use crate::infector::LogMode;
    use crate::population::Population;
    use crate::rng::RandomStream;

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

    fn isolated_simulator(region_id: RegionId, num_days: u32) -> Simulator {
        let clusters: [Vec<Cluster>; NUM_CLUSTER_TYPES] = ClusterType::ALL.map(|ct| vec![Cluster::new(0, ct)]);
        let profiles: [ContactProfile; NUM_CLUSTER_TYPES] = ClusterType::ALL.map(|_| ContactProfile::uniform(1.0));
        Simulator::new(
            region_id,
            num_days,
            1,
            false,
            LogMode::None,
            crate::calendar::DaysOffPolicy::Standard,
            Calendar::without_holidays(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            Population::new(),
            clusters,
            profiles,
            disease_config(),
            1.0,
            vec![RandomStream::new(1)],
            RandomStream::new(2),
            None,
        )
    }

    #[test]
    fn regions_with_no_travel_model_are_all_immediately_ready_and_run_independently() {
        let regions = vec![isolated_simulator(0, 3), isolated_simulator(1, 3)];
        let mut scheduler = SequentialScheduler::new(regions);
        scheduler.run_to_completion(|_| {});
        assert_eq!(scheduler.region(0).unwrap().calendar().day(), 3);
        assert_eq!(scheduler.region(1).unwrap().calendar().day(), 3);
    }

    #[test]
    fn single_region_with_no_dependencies_runs_to_completion() {
        let regions = vec![isolated_simulator(0, 5)];
        let mut scheduler = SequentialScheduler::new(regions);
        scheduler.run_to_completion(|_| {});
        assert!(scheduler.region(0).unwrap().is_done());
    }
}
