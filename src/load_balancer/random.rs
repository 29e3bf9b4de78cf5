//! Uniform random selection.

use rand::Rng;

use crate::load_balancer::LoadBalancer;

#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl LoadBalancer for Random {
    fn next_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len.max(1))
    }
}
