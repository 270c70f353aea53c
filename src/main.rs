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

//! CLI entry point. Grounded on `engine-app/src/main.rs`'s clap-derive
//! `Args` shape; the mpi/opentelemetry/kafka standalone-vs-multi-engine
//! split has no counterpart here, since spec §4.K's scheduler runs every
//! region in a single process rather than across engines wired by Kafka.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use stride::error::StrideError;
use stride::infector::LogMode;
use stride::output::{CasesFile, EventLogFile, PersonFile, SummaryFile, SummaryRow};
use stride::scheduler::SequentialScheduler;
use stride::sim::builder::SimulatorBuilder;
use stride::sim::config::{CommonSimulationConfig, LogConfig, RegionConfig, RunConfig};
use stride::sim::Simulator;
use stride::travel::{Airport, RegionTravel};

#[derive(Parser)]
#[command(author, version, about = "Stride: agent-based stochastic infectious-disease simulator")]
struct Args {
    #[arg(short = 'c', long = "config", value_name = "FILE", help = "Path to the run configuration file")]
    config: PathBuf,

    #[arg(short = 'r', long = "track-index-case", default_value_t = false)]
    #[arg(help = "Track index cases: stop secondary infections immediately to estimate R0")]
    track_index_case: bool,
}

fn main() -> Result<()> {
    stride::logging::init();
    let args = Args::parse();

    let started = Instant::now();
    let run_config = RunConfig::read(&args.config).with_context(|| format!("reading configuration {:?}", args.config))?;

    match run_config {
        RunConfig::Single(config) => {
            let common = override_track_index_case(config.common, args.track_index_case);
            run_single_region(&common, &config.log, Path::new(&config.population_file), config.num_threads, started)?;
        }
        RunConfig::Multi(config) => {
            let common = override_track_index_case(config.common, args.track_index_case);
            run_multi_region(&common, &config.log, &config.regions, config.num_threads, started)?;
        }
    }

    Ok(())
}

fn override_track_index_case(mut common: CommonSimulationConfig, track_index_case: bool) -> CommonSimulationConfig {
    common.track_index_case = common.track_index_case || track_index_case;
    common
}

fn run_single_region(
    common: &CommonSimulationConfig,
    log: &LogConfig,
    population_file: &Path,
    num_threads: usize,
    started: Instant,
) -> Result<()> {
    let build_started = Instant::now();
    let mut simulator = SimulatorBuilder::build(0, common, log, population_file, num_threads, None)
        .map_err(to_anyhow)
        .with_context(|| format!("building simulator for {:?}", population_file))?;
    let build_time_ms = build_started.elapsed().as_millis();

    let run_started = Instant::now();
    let mut events = Vec::new();
    while !simulator.is_done() {
        simulator.time_step(stride::sim::SimulationStepInput::default());
        events.extend(simulator.take_last_day_events());
    }
    let run_time_ms = run_started.elapsed().as_millis();

    write_region_outputs(&simulator, common, log, population_file, &events, run_time_ms, build_time_ms)?;

    info!("completed {} days in {} ms", common.num_days, started.elapsed().as_millis());
    Ok(())
}

fn run_multi_region(
    common: &CommonSimulationConfig,
    log: &LogConfig,
    regions: &[RegionConfig],
    num_threads: usize,
    started: Instant,
) -> Result<()> {
    let all_airports: Vec<Airport> = regions.iter().flat_map(|r| r.airports.clone()).collect();

    let mut simulators = Vec::with_capacity(regions.len());
    for region in regions {
        let travel_model = RegionTravel::new(
            region.region_id,
            region.population_file.clone(),
            region.travel_fraction,
            region.min_travel_duration,
            region.max_travel_duration,
            &all_airports,
        );
        let simulator = SimulatorBuilder::build(
            region.region_id,
            common,
            log,
            Path::new(&region.population_file),
            num_threads,
            Some(travel_model),
        )
        .map_err(to_anyhow)
        .with_context(|| format!("building region {} from {:?}", region.region_id, region.population_file))?;
        simulators.push(simulator);
    }

    let mut region_events: std::collections::HashMap<u32, Vec<stride::infector::Event>> =
        regions.iter().map(|r| (r.region_id, Vec::new())).collect();

    let mut scheduler = SequentialScheduler::new(simulators);
    scheduler.run_to_completion(|region: &mut Simulator| {
        let events = region.take_last_day_events();
        region_events.entry(region.region_id()).or_default().extend(events);
    });

    for region in regions {
        let simulator = scheduler.region(region.region_id).expect("region present after scheduling");
        let events = region_events.remove(&region.region_id).unwrap_or_default();
        write_region_outputs(simulator, common, log, Path::new(&region.population_file), &events, 0, 0)?;
    }

    info!("completed {} regions over {} days in {} ms", regions.len(), common.num_days, started.elapsed().as_millis());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_region_outputs(
    simulator: &Simulator,
    common: &CommonSimulationConfig,
    log: &LogConfig,
    population_file: &Path,
    events: &[stride::infector::Event],
    run_time_ms: u128,
    total_time_ms: u128,
) -> Result<()> {
    let prefix = format!("{}_{}", log.output_prefix, simulator.region_id());

    let mut cases_file = CasesFile::create(&prefix).map_err(to_anyhow)?;
    cases_file.print(simulator.cases_history()).map_err(to_anyhow)?;

    let num_cases = simulator.cases_history().last().copied().unwrap_or(0);
    let mut summary_file = SummaryFile::create(&prefix).map_err(to_anyhow)?;
    summary_file
        .print(&SummaryRow {
            pop_file: &population_file.to_string_lossy(),
            num_days: common.num_days,
            pop_size: simulator.population().size(),
            seeding_rate: common.seeding_rate,
            r0: common.r0,
            transmission_rate: simulator.transmission_rate(),
            immunity_rate: common.immunity_rate,
            num_threads: simulator.num_threads(),
            rng_seed: common.rng_seed,
            run_time_ms,
            total_time_ms,
            num_cases,
        })
        .map_err(to_anyhow)?;

    if log.generate_person_file {
        let mut person_file = PersonFile::create(&prefix).map_err(to_anyhow)?;
        person_file.print(simulator.population()).map_err(to_anyhow)?;
    }

    if log.log_level != LogMode::None && !events.is_empty() {
        let mut event_log = EventLogFile::create(&prefix).map_err(to_anyhow)?;
        event_log.print(events).map_err(to_anyhow)?;
    }

    Ok(())
}

fn to_anyhow(e: StrideError) -> anyhow::Error {
    anyhow::anyhow!(e.to_string())
}
