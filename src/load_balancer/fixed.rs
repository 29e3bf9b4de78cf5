//! Fixed-first selection.
//!
//! Always picks the first target. The remaining targets are kept as manual
//! failover candidates and are never chosen automatically.

use crate::load_balancer::LoadBalancer;

#[derive(Debug, Default, Clone, Copy)]
pub struct FixedFirst;

impl LoadBalancer for FixedFirst {
    fn next_index(&self, _len: usize) -> usize {
        0
    }
}
