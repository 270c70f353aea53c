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

//! Vose's alias method: O(1) sampling from a weighted discrete distribution.

use crate::error::{Result, StrideError};
use crate::rng::RandomStream;

pub struct AliasSampler {
    prob: Vec<f64>,
    alias: Vec<usize>,
}

impl AliasSampler {
    /// Builds an alias table from a weight vector. Weights need not sum to 1.
    pub fn new(weights: &[f64]) -> Result<AliasSampler> {
        let n = weights.len();
        let sum: f64 = weights.iter().sum();
        if n == 0 || sum <= 0.0 {
            return Err(StrideError::EmptyWeights);
        }

        // Scale weights to mean 1.
        let scaled: Vec<f64> = weights.iter().map(|w| w * (n as f64) / sum).collect();

        let mut prob = vec![0.0; n];
        let mut alias = vec![0usize; n];
        let mut scaled = scaled;

        let mut small: Vec<usize> = Vec::new();
        let mut large: Vec<usize> = Vec::new();
        for (i, w) in scaled.iter().enumerate() {
            if *w < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        while let (Some(s), Some(l)) = (small.pop(), large.pop()) {
            prob[s] = scaled[s];
            alias[s] = l;
            scaled[l] = (scaled[l] + scaled[s]) - 1.0;
            if scaled[l] < 1.0 {
                small.push(l);
            } else {
                large.push(l);
            }
        }

        for i in large {
            prob[i] = 1.0;
        }
        for i in small {
            prob[i] = 1.0;
        }

        Ok(AliasSampler { prob, alias })
    }

    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draws one sample in `[0, n)` in O(1).
    pub fn next(&self, rng: &mut RandomStream) -> usize {
        let roll = rng.next_uint((self.prob.len() - 1) as u32) as usize;
        let flip = rng.next_double();
        if flip <= self.prob[roll] {
            roll
        } else {
            self.alias[roll]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_weights() {
        assert!(matches!(AliasSampler::new(&[]), Err(StrideError::EmptyWeights)));
    }

    #[test]
    fn rejects_zero_sum_weights() {
        assert!(matches!(AliasSampler::new(&[0.0, 0.0]), Err(StrideError::EmptyWeights)));
    }

    #[test]
    fn single_weight_always_samples_zero() {
        let sampler = AliasSampler::new(&[5.0]).unwrap();
        let mut rng = RandomStream::new(1);
        for _ in 0..100 {
            assert_eq!(sampler.next(&mut rng), 0);
        }
    }

    #[test]
    fn distribution_matches_weights_within_tolerance() {
        let weights = [0.1, 0.3, 0.6];
        let sampler = AliasSampler::new(&weights).unwrap();
        let mut rng = RandomStream::new(2024);
        let n = 200_000;
        let mut counts = [0u32; 3];
        for _ in 0..n {
            counts[sampler.next(&mut rng)] += 1;
        }
        for (i, w) in weights.iter().enumerate() {
            let frac = counts[i] as f64 / n as f64;
            assert!((frac - w).abs() < 0.01, "bucket {} frac {} vs weight {}", i, frac, w);
        }
    }
}
