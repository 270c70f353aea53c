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

//! Extension hook for the generic behaviour/belief policies the original
//! engine parameterized `Person` with (`behaviour_policies`/`belief_policies`
//! template parameters). The belief pathway is inert in the core simulation;
//! only the no-op default is implemented here, per spec §9 Design Notes.

pub trait BeliefPolicy: Send + Sync {
    /// Called once per day alongside `Person::update`. The default policy
    /// does nothing; this hook exists so a future belief model can observe
    /// daily updates without changing `Person`'s shape.
    fn on_update(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoBelief;

impl BeliefPolicy for NoBelief {}
