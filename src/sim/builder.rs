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

//! Assembles a ready-to-run [`Simulator`] from declarative configuration.
//! Grounded on `sim/SimulatorBuilder.cpp` (calendar/rng/cluster/contact
//! profile wiring) and `pop/PopulationBuilder.cpp` (population loading,
//! immunity/infection seeding, survey participant selection).

use std::fs::File;
use std::io::{BufReader, Read as _};
use std::path::Path;

use chrono::NaiveDate;

use crate::calendar::{Calendar, HolidayFile};
use crate::cluster::{Cluster, ClusterType, ContactProfile, NUM_CLUSTER_TYPES};
use crate::disease::DiseaseConfig;
use crate::error::{Result, StrideError};
use crate::infector::LogMode;
use crate::person::{Gender, Person};
use crate::population::Population;
use crate::rng::RandomStream;
use crate::sim::config::{CommonSimulationConfig, LogConfig, RegionConfig};
use crate::sim::Simulator;
use crate::travel::RegionTravel;

/// Per-cluster-type contact rates, keyed by participant age (0..=80).
/// Parsed from the JSON shape described in spec §6: per cluster type, a
/// list (ordered by age) of participants, each with a list of `contact`
/// entries carrying a `rate`; the sum of rates is the profile value for
/// that age, mirroring `core/ContactProfile.cpp`.
#[derive(Debug, serde::Deserialize)]
struct ContactMatrixFile {
    #[serde(rename = "Household")]
    household: Vec<ContactMatrixParticipant>,
    #[serde(rename = "School")]
    school: Vec<ContactMatrixParticipant>,
    #[serde(rename = "Work")]
    work: Vec<ContactMatrixParticipant>,
    #[serde(rename = "PrimaryCommunity")]
    primary_community: Vec<ContactMatrixParticipant>,
    #[serde(rename = "SecondaryCommunity")]
    secondary_community: Vec<ContactMatrixParticipant>,
}

#[derive(Debug, serde::Deserialize)]
struct ContactMatrixParticipant {
    contacts: Vec<ContactMatrixEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct ContactMatrixEntry {
    rate: f64,
}

impl ContactMatrixFile {
    fn into_profiles(self) -> [ContactProfile; NUM_CLUSTER_TYPES] {
        fn build(participants: Vec<ContactMatrixParticipant>) -> ContactProfile {
            ContactProfile::new(participants.into_iter().map(|p| p.contacts.iter().map(|c| c.rate).sum()).collect())
        }
        // Order matches `ClusterType::ALL`.
        [
            build(self.household),
            build(self.school),
            build(self.work),
            build(self.primary_community),
            build(self.secondary_community),
        ]
    }
}

/// Builds a single-region [`Simulator`] from a population CSV and the
/// supporting disease/contact/holiday files named in `common`/`log`.
pub struct SimulatorBuilder;

impl SimulatorBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        region_id: u32,
        common: &CommonSimulationConfig,
        log: &LogConfig,
        population_file: &Path,
        num_threads: usize,
        travel_model: Option<RegionTravel>,
    ) -> Result<Simulator> {
        let mut rng = RandomStream::new(common.rng_seed);

        let disease_config = read_json::<DiseaseConfig>(Path::new(&common.disease_config_file))?;
        let transmission_rate = disease_config.transmission_rate(common.r0);
        let contact_profiles = read_json::<ContactMatrixFile>(Path::new(&common.age_contact_matrix_file))?.into_profiles();

        let start_date = NaiveDate::parse_from_str(&common.start_date, "%Y-%m-%d")
            .map_err(|e| StrideError::Config(format!("invalid start_date {:?}: {}", common.start_date, e)))?;
        let (holidays, school_holidays) = match &common.holidays_file {
            Some(path) => {
                let mut contents = String::new();
                File::open(path)?.read_to_string(&mut contents)?;
                HolidayFile::from_json(&contents)?.into_dates()
            }
            None => (Default::default(), Default::default()),
        };
        let calendar = Calendar::new(start_date, holidays, school_holidays);

        let population = Self::load_population(population_file, &disease_config, &mut rng)?;

        if common.seeding_rate + common.immunity_rate > 1.0 {
            return Err(StrideError::Config("seeding_rate + immunity_rate must not exceed 1".to_string()));
        }

        if log.log_level == LogMode::Contacts {
            let participants = population.get_random_persons_matching(&mut rng, common.num_participants_survey, |p| {
                !p.is_participating_in_survey()
            })?;
            for p in participants {
                p.participate_in_survey();
            }
        }

        let num_immune = (population.size() as f64 * common.immunity_rate).floor() as usize;
        for p in population.get_random_persons_matching(&mut rng, num_immune, |p| p.health().is_susceptible())? {
            p.health_mut().set_immune();
        }

        let num_infected = (population.size() as f64 * common.seeding_rate).floor() as usize;
        for p in population.get_random_persons_matching(&mut rng, num_infected, |p| p.health().is_susceptible())? {
            p.health_mut().start_infection();
        }

        let clusters = Self::build_clusters(&population);

        let rng_handlers: Vec<RandomStream> = {
            let base_seed = rng.next_uint(u32::MAX) as u64;
            (0..num_threads.max(1) as u32).map(|i| RandomStream::new(base_seed).split(num_threads.max(1) as u32, i)).collect()
        };
        let travel_rng = RandomStream::new(rng.next_uint(u32::MAX) as u64);

        Ok(Simulator::new(
            region_id,
            common.num_days,
            num_threads,
            common.track_index_case,
            log.log_level,
            common.days_off_policy,
            calendar,
            population,
            clusters,
            contact_profiles,
            disease_config,
            transmission_rate,
            rng_handlers,
            travel_rng,
            travel_model,
        ))
    }

    /// Loads the population CSV per spec §6: `age, household_id, school_id,
    /// work_id, primary_community_id, secondary_community_id`. Sequential
    /// ids are assigned starting at 0, matching `PopulationBuilder.cpp`.
    fn load_population(path: &Path, disease_config: &DiseaseConfig, rng: &mut RandomStream) -> Result<Population> {
        let mut reader =
            csv::ReaderBuilder::new().has_headers(true).from_path(path).map_err(|e| StrideError::Config(e.to_string()))?;

        let mut population = Population::new();
        for (person_id, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StrideError::Config(e.to_string()))?;
            let field = |i: usize| -> Result<u32> {
                record
                    .get(i)
                    .ok_or_else(|| StrideError::Config(format!("population row {} missing column {}", person_id, i)))?
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| StrideError::Config(e.to_string()))
            };
            let age = field(0)?;
            let household_id = field(1)?;
            let school_id = field(2)?;
            let work_id = field(3)?;
            let primary_community_id = field(4)?;
            let secondary_community_id = field(5)?;

            let fate = disease_config.sample_fate(rng);
            let gender = if person_id % 2 == 0 { Gender::Male } else { Gender::Female };
            let person = Person::new(person_id as u64, age, gender, fate);
            person.set_cluster_id(ClusterType::Household, household_id);
            person.set_cluster_id(ClusterType::School, school_id);
            person.set_cluster_id(ClusterType::Work, work_id);
            person.set_cluster_id(ClusterType::PrimaryCommunity, primary_community_id);
            person.set_cluster_id(ClusterType::SecondaryCommunity, secondary_community_id);
            population.insert(person);
        }

        if population.size() <= 2 {
            return Err(StrideError::Config("population is too small".to_string()));
        }

        Ok(population)
    }

    /// Allocates `max(cluster_id) + 1` empty clusters per type (index 0 is
    /// the "not a member" sentinel and stays empty) and walks the
    /// population once per type to insert everybody into their cluster.
    fn build_clusters(population: &Population) -> [Vec<Cluster>; NUM_CLUSTER_TYPES] {
        let mut max_ids = [0u32; NUM_CLUSTER_TYPES];
        population.serial_for(|p, _| {
            for ct in ClusterType::ALL {
                max_ids[ct.index()] = max_ids[ct.index()].max(p.cluster_id(ct));
            }
        });

        let mut clusters: [Vec<Cluster>; NUM_CLUSTER_TYPES] =
            ClusterType::ALL.map(|ct| (0..=max_ids[ct.index()]).map(|id| Cluster::new(id, ct)).collect());

        population.serial_for(|p, _| {
            for ct in ClusterType::ALL {
                let id = p.cluster_id(ct);
                if id != 0 {
                    clusters[ct.index()][id as usize].add_person(p.clone());
                }
            }
        });

        clusters
    }
}

fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(Into::into)
}
