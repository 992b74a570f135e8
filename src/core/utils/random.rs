/*!
 * Copyright (c) 2016 Microsoft Corporation. All rights reserved.
 * Licensed under the MIT License. See LICENSE file in the project root for license information.
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// A wrapper for random generator.
///
/// The linear congruential step (`x = x * 214013 + 2531011`) is the
/// reproducibility contract of feature bundling: two runs seeded with the
/// same value produce identical group layouts.
#[derive(Debug)]
pub struct Random {
    x: u32,
}

impl Random {
    /// Constructor, with random seed
    pub fn new() -> Self {
        let mut rng = StdRng::from_entropy();
        let seed: i32 = rng.gen_range(0..=65536);
        Random { x: seed as u32 }
    }

    /// Constructor, with specific seed
    pub fn with_seed(seed: i32) -> Self {
        Random { x: seed as u32 }
    }

    /// Generate random integer, int16 range. [0, 65536]
    /// Returns the random integer between [lower_bound, upper_bound)
    pub fn next_short(&mut self, lower_bound: i32, upper_bound: i32) -> i32 {
        self.rand_int16() % (upper_bound - lower_bound) + lower_bound
    }

    /// Generate random integer, int32 range
    /// Returns the random integer between [lower_bound, upper_bound)
    pub fn next_int(&mut self, lower_bound: i32, upper_bound: i32) -> i32 {
        self.rand_int32() % (upper_bound - lower_bound) + lower_bound
    }

    /// Generate random float data
    /// Returns the random float between [0.0, 1.0)
    pub fn next_float(&mut self) -> f32 {
        (self.rand_int16() as f32) / 32768.0
    }

    /// Sample K data from {0,1,...,N-1}
    /// Returns K ordered sampled data from {0,1,...,N-1}
    pub fn sample(&mut self, n: i32, k: i32) -> Vec<i32> {
        let mut ret = Vec::new();
        ret.reserve(k.max(0) as usize);

        if k > n || k <= 0 {
            return ret;
        } else if k == n {
            for i in 0..n {
                ret.push(i);
            }
        } else if k > 1 && (k as f64) > (n as f64 / (k as f64).log2()) {
            for i in 0..n {
                let prob = (k - ret.len() as i32) as f64 / (n - i) as f64;
                if self.next_float() < prob as f32 {
                    ret.push(i);
                }
            }
        } else {
            let mut sample_set = HashSet::new();
            for r in (n - k)..n {
                let v = self.next_int(0, r + 1);
                if !sample_set.insert(v) {
                    sample_set.insert(r);
                }
            }
            let mut sorted_vec: Vec<i32> = sample_set.into_iter().collect();
            sorted_vec.sort_unstable();
            ret = sorted_vec;
        }

        ret
    }

    /// Generate random int16
    fn rand_int16(&mut self) -> i32 {
        self.x = self.x.wrapping_mul(214013).wrapping_add(2531011);
        ((self.x >> 16) & 0x7FFF) as i32
    }

    /// Generate random int32
    fn rand_int32(&mut self) -> i32 {
        self.x = self.x.wrapping_mul(214013).wrapping_add(2531011);
        (self.x & 0x7FFFFFFF) as i32
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}
