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

use fnv::FnvHashMap;
use rayon::prelude::*;

use crate::error::{Result, StrideError};
use crate::person::{Person, PersonId};
use crate::rng::RandomStream;

/// Owning, keyed container of residents.
pub struct Population {
    people: FnvHashMap<PersonId, Person>,
    max_id: PersonId,
}

impl Population {
    pub fn new() -> Population {
        Population { people: FnvHashMap::default(), max_id: 0 }
    }

    pub fn insert(&mut self, person: Person) {
        if person.id() > self.max_id {
            self.max_id = person.id();
        }
        self.people.insert(person.id(), person);
    }

    /// Removes and returns the person with the given id.
    pub fn extract(&mut self, id: PersonId) -> Option<Person> {
        self.people.remove(&id)
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub fn size(&self) -> usize {
        self.people.len()
    }

    pub fn max_id(&self) -> PersonId {
        self.max_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub fn get_infected_count(&self) -> usize {
        self.people.values().filter(|p| p.health().is_infected() || p.health().is_recovered()).count()
    }

    /// `count` distinct ids drawn uniformly without replacement.
    pub fn get_random_persons(&self, rng: &mut RandomStream, count: usize) -> Result<Vec<Person>> {
        self.get_random_persons_matching(rng, count, |_| true)
    }

    /// Same, but each sampled person must satisfy `predicate`. Samples in
    /// rounds, drawing ids without replacement and accumulating matches
    /// across rounds; the sample size only doubles (clamped to population
    /// size) when a round finds no *new* matches, and fails once the
    /// sample size has reached the population size and the count still
    /// cannot be met.
    pub fn get_random_persons_matching(
        &self,
        rng: &mut RandomStream,
        count: usize,
        predicate: impl Fn(&Person) -> bool,
    ) -> Result<Vec<Person>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let pop_size = self.people.len();
        let mut remaining_ids: Vec<PersonId> = self.people.keys().copied().collect();
        let mut matches: Vec<Person> = Vec::new();
        let mut sample_size = count.min(pop_size);

        loop {
            let draw_size = sample_size.min(remaining_ids.len());
            let drawn = Self::unique_random_ids(rng, &remaining_ids, draw_size);
            let drawn_set: std::collections::HashSet<PersonId> = drawn.iter().copied().collect();
            remaining_ids.retain(|id| !drawn_set.contains(id));

            let matched_before = matches.len();
            matches.extend(drawn.iter().filter_map(|id| self.people.get(id)).filter(|p| predicate(p)).cloned());

            if matches.len() >= count {
                matches.truncate(count);
                return Ok(matches);
            }

            if matches.len() == matched_before {
                if sample_size >= pop_size {
                    return Err(StrideError::NotEnoughCandidates { deficit: count - matches.len() });
                }
                sample_size = (sample_size * 2).min(pop_size);
            }

            if remaining_ids.is_empty() {
                return Err(StrideError::NotEnoughCandidates { deficit: count - matches.len() });
            }
        }
    }

    fn unique_random_ids(rng: &mut RandomStream, ids: &[PersonId], count: usize) -> Vec<PersonId> {
        let n = ids.len();
        let count = count.min(n);
        let mut chosen_positions: Vec<usize> = Vec::with_capacity(count);
        let mut seen = std::collections::HashSet::with_capacity(count);
        while chosen_positions.len() < count {
            let pos = rng.next_uint((n - 1) as u32) as usize;
            if seen.insert(pos) {
                chosen_positions.push(pos);
            }
        }
        chosen_positions.into_iter().map(|pos| ids[pos]).collect()
    }

    /// Partitions ids into `num_threads` contiguous ranges and applies
    /// `action(person, worker_id)` to each, in parallel.
    pub fn parallel_for(&self, num_threads: usize, action: impl Fn(&Person, usize) + Sync) {
        let mut ids: Vec<PersonId> = self.people.keys().copied().collect();
        ids.sort_unstable();
        let num_threads = num_threads.max(1);
        let chunk_size = (ids.len() + num_threads - 1) / num_threads.max(1).max(1);
        let chunk_size = chunk_size.max(1);
        ids.par_chunks(chunk_size).enumerate().for_each(|(worker_id, chunk)| {
            for id in chunk {
                if let Some(p) = self.people.get(id) {
                    action(p, worker_id);
                }
            }
        });
    }

    /// Single-threaded equivalent of `parallel_for`.
    pub fn serial_for(&self, action: impl Fn(&Person, usize)) {
        let mut ids: Vec<PersonId> = self.people.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(p) = self.people.get(&id) {
                action(p, 0);
            }
        }
    }
}

impl Default for Population {
    fn default() -> Self {
        Population::new()
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

    fn make_population(n: u64) -> Population {
        let mut pop = Population::new();
        for i in 0..n {
            pop.insert(Person::new(i, 30, Gender::Male, fate()));
        }
        pop
    }

    #[test]
    fn get_random_persons_zero_returns_empty() {
        let pop = make_population(10);
        let mut rng = RandomStream::new(1);
        let result = pop.get_random_persons(&mut rng, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn get_random_persons_returns_distinct_ids() {
        let pop = make_population(20);
        let mut rng = RandomStream::new(1);
        let result = pop.get_random_persons(&mut rng, 5).unwrap();
        assert_eq!(result.len(), 5);
        let mut ids: Vec<_> = result.iter().map(|p| p.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn predicate_sampling_fails_when_exhausted() {
        let pop = make_population(5);
        let mut rng = RandomStream::new(1);
        let result = pop.get_random_persons_matching(&mut rng, 3, |p| p.id() == 0);
        assert!(matches!(result, Err(StrideError::NotEnoughCandidates { .. })));
    }

    #[test]
    fn infected_count_counts_infected_and_recovered() {
        let pop = make_population(3);
        pop.get(0).unwrap().health_mut().start_infection();
        pop.get(1).unwrap().health_mut().start_infection();
        pop.get(1).unwrap().health_mut().stop_infection();
        assert_eq!(pop.get_infected_count(), 2);
    }
}
