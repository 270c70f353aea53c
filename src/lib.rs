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

//! Stride: an agent-based stochastic simulator of infectious-disease
//! spread through a synthetic population partitioned into social
//! clusters, with a multi-region travel/exchange protocol binding
//! per-region engines together.

pub mod behaviour;
pub mod calendar;
pub mod cluster;
pub mod disease;
pub mod error;
pub mod infector;
pub mod logging;
pub mod output;
pub mod person;
pub mod population;
pub mod rng;
pub mod scheduler;
pub mod sim;
pub mod travel;

pub use error::{Result, StrideError};
