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

use super::Fate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Susceptible,
    Exposed,
    Infectious,
    Symptomatic,
    InfectiousAndSymptomatic,
    Recovered,
    Immune,
}

/// Per-person disease timeline. `StartInfection`/`StopInfection` are
/// programmer-error-checked: calling them outside their valid source state
/// panics, matching the original's `assert` guards and spec §7's
/// classification of these as fatal, never-caught invariant violations.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    status: HealthStatus,
    fate: Fate,
    days_infected: u32,
}

impl Health {
    pub fn new(fate: Fate) -> Health {
        Health { status: HealthStatus::Susceptible, fate, days_infected: 0 }
    }

    /// Builds a health record with a fresh `fate` but a given `status`/
    /// `days_infected`, used when a traveler is handed a newly-sampled
    /// disease timeline on arrival while keeping their current disease
    /// progress.
    pub fn with_status(fate: Fate, status: HealthStatus, days_infected: u32) -> Health {
        Health { status, fate, days_infected }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn fate(&self) -> Fate {
        self.fate
    }

    pub fn days_infected(&self) -> u32 {
        self.days_infected
    }

    pub fn is_susceptible(&self) -> bool {
        self.status == HealthStatus::Susceptible
    }

    pub fn is_infectious(&self) -> bool {
        matches!(self.status, HealthStatus::Infectious | HealthStatus::InfectiousAndSymptomatic)
    }

    pub fn is_symptomatic(&self) -> bool {
        matches!(self.status, HealthStatus::Symptomatic | HealthStatus::InfectiousAndSymptomatic)
    }

    pub fn is_infected(&self) -> bool {
        matches!(
            self.status,
            HealthStatus::Exposed
                | HealthStatus::Infectious
                | HealthStatus::Symptomatic
                | HealthStatus::InfectiousAndSymptomatic
        )
    }

    pub fn is_recovered(&self) -> bool {
        self.status == HealthStatus::Recovered
    }

    pub fn is_immune(&self) -> bool {
        self.status == HealthStatus::Immune
    }

    /// Non-susceptible and not immune: a "case" for cluster partitioning purposes.
    pub fn is_case(&self) -> bool {
        !self.is_susceptible() && !self.is_immune()
    }

    pub fn set_immune(&mut self) {
        self.status = HealthStatus::Immune;
    }

    pub fn start_infection(&mut self) {
        if !self.is_susceptible() {
            panic!("Health::start_infection: person is not susceptible");
        }
        self.status = HealthStatus::Exposed;
        self.days_infected = 0;
    }

    pub fn stop_infection(&mut self) {
        if !self.is_infected() {
            panic!("Health::stop_infection: person is not infected");
        }
        self.status = HealthStatus::Recovered;
    }

    /// Advances the disease timeline by one day. A no-op unless currently infected.
    pub fn update(&mut self) {
        if !self.is_infected() {
            return;
        }

        self.days_infected += 1;
        let d = self.days_infected;

        if d == self.fate.start_infectious {
            self.status = match self.status {
                HealthStatus::Symptomatic => HealthStatus::InfectiousAndSymptomatic,
                _ => HealthStatus::Infectious,
            };
        } else if d == self.fate.end_infectious {
            self.status = match self.status {
                HealthStatus::InfectiousAndSymptomatic => HealthStatus::Symptomatic,
                _ => {
                    self.stop_infection();
                    return;
                }
            };
        } else if d == self.fate.start_symptomatic {
            self.status = match self.status {
                HealthStatus::Infectious => HealthStatus::InfectiousAndSymptomatic,
                _ => HealthStatus::Symptomatic,
            };
        } else if d == self.fate.end_symptomatic {
            self.status = match self.status {
                HealthStatus::InfectiousAndSymptomatic => HealthStatus::Infectious,
                _ => {
                    self.stop_infection();
                    return;
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fate(start_inf: u32, end_inf: u32, start_sym: u32, end_sym: u32) -> Fate {
        Fate { start_infectious: start_inf, end_infectious: end_inf, start_symptomatic: start_sym, end_symptomatic: end_sym }
    }

    #[test]
    fn start_infection_requires_susceptible() {
        let mut h = Health::new(fate(2, 10, 3, 8));
        h.start_infection();
        assert_eq!(h.status(), HealthStatus::Exposed);
    }

    #[test]
    #[should_panic(expected = "not susceptible")]
    fn start_infection_panics_if_not_susceptible() {
        let mut h = Health::new(fate(2, 10, 3, 8));
        h.start_infection();
        h.start_infection();
    }

    #[test]
    #[should_panic(expected = "not infected")]
    fn stop_infection_panics_if_not_infected() {
        let mut h = Health::new(fate(2, 10, 3, 8));
        h.stop_infection();
    }

    #[test]
    fn days_infected_increments_only_while_infected() {
        let mut h = Health::new(fate(2, 10, 3, 8));
        h.update();
        assert_eq!(h.days_infected(), 0);
        h.start_infection();
        h.update();
        assert_eq!(h.days_infected(), 1);
    }

    #[test]
    fn full_timeline_exposed_to_recovered_asymptomatic_path() {
        // start_infectious=2, end_infectious=10, start_symptomatic later than end_infectious => never symptomatic.
        let mut h = Health::new(fate(2, 4, 100, 200));
        h.start_infection();
        h.update(); // day 1
        assert_eq!(h.status(), HealthStatus::Exposed);
        h.update(); // day 2 -> Infectious
        assert_eq!(h.status(), HealthStatus::Infectious);
        h.update(); // day 3
        assert_eq!(h.status(), HealthStatus::Infectious);
        h.update(); // day 4 -> end_infectious, not symptomatic -> Recovered
        assert_eq!(h.status(), HealthStatus::Recovered);
    }

    #[test]
    fn timeline_with_symptomatic_overlap() {
        let mut h = Health::new(fate(2, 6, 3, 5));
        h.start_infection();
        h.update(); // 1 Exposed
        h.update(); // 2 -> Infectious
        assert_eq!(h.status(), HealthStatus::Infectious);
        h.update(); // 3 -> start_symptomatic, Infectious -> InfectiousAndSymptomatic
        assert_eq!(h.status(), HealthStatus::InfectiousAndSymptomatic);
        h.update(); // 4
        assert_eq!(h.status(), HealthStatus::InfectiousAndSymptomatic);
        h.update(); // 5 -> end_symptomatic, InfectiousAndSymptomatic -> Infectious
        assert_eq!(h.status(), HealthStatus::Infectious);
        h.update(); // 6 -> end_infectious, not InfectiousAndSymptomatic -> Recovered
        assert_eq!(h.status(), HealthStatus::Recovered);
    }

    #[test]
    fn set_immune_is_terminal_from_any_state() {
        let mut h = Health::new(fate(2, 10, 3, 8));
        h.set_immune();
        assert!(h.is_immune());
        assert!(!h.is_case());
    }
}
