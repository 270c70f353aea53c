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

//! Airport/route graph and the per-region destination distribution it
//! induces. This replaces the teacher's own `orchestrator::travel_plan`
//! region x region OD-matrix model, which is a different (and simpler)
//! model than the one this spec requires; grounded instead on
//! `multiregion/TravelModel.h/.cpp`.

pub mod journal;

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::Result;
use crate::rng::alias::AliasSampler;

pub type RegionId = u32;

#[derive(Debug, Clone, Deserialize)]
pub struct AirRoute {
    pub passenger_fraction: f64,
    pub target_region: RegionId,
    pub target_airport: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Airport {
    pub name: String,
    pub region_id: RegionId,
    pub passenger_fraction: f64,
    pub routes: Vec<AirRoute>,
}

/// The travel model for one region: its local airports, the outgoing
/// routes they carry, and the set of regions that may send it visitors.
#[derive(Debug, Clone)]
pub struct RegionTravel {
    region_id: RegionId,
    population_path: String,
    travel_fraction: f64,
    min_duration: u32,
    max_duration: u32,
    local_airports: Vec<Airport>,
    regions_with_incoming_routes: HashSet<RegionId>,
}

impl RegionTravel {
    /// Builds a region's travel model from the full airport list (all
    /// regions), filtering to this region's local airports and scanning
    /// every airport's routes for ones targeting this region.
    pub fn new(
        region_id: RegionId,
        population_path: String,
        travel_fraction: f64,
        min_duration: u32,
        max_duration: u32,
        all_airports: &[Airport],
    ) -> RegionTravel {
        let local_airports: Vec<Airport> =
            all_airports.iter().filter(|a| a.region_id == region_id).cloned().collect();

        let mut regions_with_incoming_routes = HashSet::new();
        let local_airport_names: HashSet<&str> = local_airports.iter().map(|a| a.name.as_str()).collect();
        for airport in all_airports {
            for route in &airport.routes {
                if local_airport_names.contains(route.target_airport.as_str()) {
                    regions_with_incoming_routes.insert(airport.region_id);
                }
            }
        }

        RegionTravel {
            region_id,
            population_path,
            travel_fraction,
            min_duration,
            max_duration,
            local_airports,
            regions_with_incoming_routes,
        }
    }

    pub fn region_id(&self) -> RegionId {
        self.region_id
    }

    pub fn population_path(&self) -> &str {
        &self.population_path
    }

    pub fn travel_fraction(&self) -> f64 {
        self.travel_fraction
    }

    pub fn min_duration(&self) -> u32 {
        self.min_duration
    }

    pub fn max_duration(&self) -> u32 {
        self.max_duration
    }

    pub fn local_airports(&self) -> &[Airport] {
        &self.local_airports
    }

    pub fn regions_with_incoming_routes(&self) -> &HashSet<RegionId> {
        &self.regions_with_incoming_routes
    }

    /// Builds the per-destination-region weight vector from this region's
    /// local airports' normalized route fractions (spec §4.H), and an
    /// alias sampler over it. Returns `None` if there are no outgoing
    /// routes at all.
    pub fn destination_distribution(&self) -> Option<(Vec<RegionId>, Result<AliasSampler>)> {
        let mut weight_by_region: std::collections::BTreeMap<RegionId, f64> = std::collections::BTreeMap::new();

        for airport in &self.local_airports {
            let route_sum: f64 = airport.routes.iter().map(|r| r.passenger_fraction).sum();
            if route_sum <= 0.0 {
                continue;
            }
            for route in &airport.routes {
                let weight = airport.passenger_fraction * route.passenger_fraction / route_sum;
                *weight_by_region.entry(route.target_region).or_insert(0.0) += weight;
            }
        }

        if weight_by_region.is_empty() {
            return None;
        }

        let regions: Vec<RegionId> = weight_by_region.keys().copied().collect();
        let weights: Vec<f64> = weight_by_region.values().copied().collect();
        Some((regions, AliasSampler::new(&weights)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(name: &str, region: RegionId, frac: f64, routes: Vec<AirRoute>) -> Airport {
        Airport { name: name.to_string(), region_id: region, passenger_fraction: frac, routes }
    }

    #[test]
    fn region_with_no_routes_has_no_destination_distribution() {
        let airports = vec![airport("A", 0, 1.0, vec![])];
        let model = RegionTravel::new(0, "pop.csv".into(), 0.01, 1, 5, &airports);
        assert!(model.destination_distribution().is_none());
    }

    #[test]
    fn incoming_routes_detected_from_other_regions() {
        let airports = vec![
            airport("A", 0, 1.0, vec![]),
            airport(
                "B",
                1,
                1.0,
                vec![AirRoute { passenger_fraction: 1.0, target_region: 0, target_airport: "A".to_string() }],
            ),
        ];
        let model = RegionTravel::new(0, "pop.csv".into(), 0.01, 1, 5, &airports);
        assert!(model.regions_with_incoming_routes().contains(&1));
    }

    #[test]
    fn destination_weights_normalize_route_fractions() {
        let airports = vec![airport(
            "A",
            0,
            1.0,
            vec![
                AirRoute { passenger_fraction: 0.25, target_region: 1, target_airport: "B".to_string() },
                AirRoute { passenger_fraction: 0.75, target_region: 2, target_airport: "C".to_string() },
            ],
        )];
        let model = RegionTravel::new(0, "pop.csv".into(), 0.01, 1, 5, &airports);
        let (regions, sampler) = model.destination_distribution().unwrap();
        let sampler = sampler.unwrap();
        assert_eq!(regions, vec![1, 2]);
        assert_eq!(sampler.len(), 2);
    }
}
