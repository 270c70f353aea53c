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

//! Output file writers (spec §6). Grounded on `output/CasesFile.cpp`,
//! `output/SummaryFile.cpp` and `output/PersonFile.cpp`; the event log
//! described in spec §4.F is written by [`EventLogFile`], one line per
//! `Event` emitted by the `Infector`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::infector::Event;
use crate::population::Population;

/// `<prefix>_cases.csv`: one line, `num_days` comma-separated cumulative
/// infected counts, day 0 first.
pub struct CasesFile {
    writer: BufWriter<File>,
}

impl CasesFile {
    pub fn create(prefix: &str) -> Result<CasesFile> {
        let file = File::create(Path::new(&format!("{}_cases.csv", prefix)))?;
        Ok(CasesFile { writer: BufWriter::new(file) })
    }

    pub fn print(&mut self, cases: &[usize]) -> Result<()> {
        let line = cases.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// `<prefix>_summary.csv`: one header row, one data row per region.
pub struct SummaryFile {
    writer: BufWriter<File>,
}

/// The fields of one `SummaryFile` data row, named after spec §6's header.
pub struct SummaryRow<'a> {
    pub pop_file: &'a str,
    pub num_days: u32,
    pub pop_size: usize,
    pub seeding_rate: f64,
    pub r0: f64,
    pub transmission_rate: f64,
    pub immunity_rate: f64,
    pub num_threads: usize,
    pub rng_seed: u64,
    pub run_time_ms: u128,
    pub total_time_ms: u128,
    pub num_cases: usize,
}

impl SummaryFile {
    pub fn create(prefix: &str) -> Result<SummaryFile> {
        let file = File::create(Path::new(&format!("{}_summary.csv", prefix)))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "pop_file,num_days,pop_size,seeding_rate,R0,transm_rate,immunity_rate,num_threads,rng_seed,run_time_ms,total_time_ms,num_cases,attack_rate"
        )?;
        Ok(SummaryFile { writer })
    }

    pub fn print(&mut self, row: &SummaryRow) -> Result<()> {
        let attack_rate = if row.pop_size == 0 { 0.0 } else { row.num_cases as f64 / row.pop_size as f64 };
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            row.pop_file,
            row.num_days,
            row.pop_size,
            row.seeding_rate,
            row.r0,
            row.transmission_rate,
            row.immunity_rate,
            row.num_threads,
            row.rng_seed,
            row.run_time_ms,
            row.total_time_ms,
            row.num_cases,
            attack_rate,
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// `<prefix>_person.csv` (optional): per infected person, their fate.
pub struct PersonFile {
    writer: BufWriter<File>,
}

impl PersonFile {
    pub fn create(prefix: &str) -> Result<PersonFile> {
        let file = File::create(Path::new(&format!("{}_person.csv", prefix)))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "id;is_recovered;is_immune;start_inf;end_inf;start_sym;end_sym")?;
        Ok(PersonFile { writer })
    }

    pub fn print(&mut self, population: &Population) -> Result<()> {
        for person in population.iter() {
            let health = person.health();
            if health.is_susceptible() {
                continue;
            }
            let fate = health.fate();
            writeln!(
                self.writer,
                "{};{};{};{};{};{};{}",
                person.id(),
                health.is_recovered() as u8,
                health.is_immune() as u8,
                fate.start_infectious,
                fate.end_infectious,
                fate.start_symptomatic,
                fate.end_symptomatic,
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// `<prefix>_logfile`: one line per transmission/contact event (spec §4.F).
pub struct EventLogFile {
    writer: BufWriter<File>,
}

impl EventLogFile {
    pub fn create(prefix: &str) -> Result<EventLogFile> {
        let file = File::create(Path::new(&format!("{}_logfile", prefix)))?;
        Ok(EventLogFile { writer: BufWriter::new(file) })
    }

    pub fn print(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            match event {
                Event::Transmission { infecter_id, infected_id, cluster_type, day } => {
                    writeln!(self.writer, "TRAN {} {} {} {}", infecter_id, infected_id, cluster_type, day)?;
                }
                Event::Contact { p1_id, p1_age, p2_age, flags, day } => {
                    writeln!(
                        self.writer,
                        "CONT {} {} {} {} {} {} {} {} {}",
                        p1_id,
                        p1_age,
                        p2_age,
                        flags[0] as u8,
                        flags[1] as u8,
                        flags[2] as u8,
                        flags[3] as u8,
                        flags[4] as u8,
                        day
                    )?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}
