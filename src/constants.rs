//! ringflow tunables
//!
//! Core constants shared by the queue, arena, and scheduler modules.

/// Cache line size for alignment (64 bytes on most CPUs).
pub const CACHE_LINE_SIZE: usize = 64;

/// Default element count per region in a `RegionArena`.
pub const DEFAULT_REGION_CAPACITY: usize = 4096;

/// Default ceiling on the number of regions a `RegionArena` may allocate.
pub const DEFAULT_MAX_REGIONS: usize = 1024;

/// `DEFAULT_REGION_CAPACITY * DEFAULT_MAX_REGIONS` — the default maximum
/// number of live job handles the scheduler's arena can hold per epoch.
pub const DEFAULT_MAX_JOBS: usize = DEFAULT_REGION_CAPACITY * DEFAULT_MAX_REGIONS;

/// Guard margin subtracted from `max_jobs` before the scheduler's
/// health-check forces an epoch reset. See `scheduler::Scheduler`.
pub const HEALTHCHECK_GUARD_MARGIN: usize = 20;

/// Default starting capacity for a flat arena when none is given.
pub const DEFAULT_FLAT_ARENA_CAPACITY: usize = 8;

/// Growth factor applied by a DYNAMIC flat arena on overflow.
pub const FLAT_ARENA_GROWTH_FACTOR: f64 = 1.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_line_size_is_power_of_two() {
        assert!(CACHE_LINE_SIZE.is_power_of_two());
    }

    #[test]
    fn test_max_jobs_derivation() {
        assert_eq!(DEFAULT_MAX_JOBS, 4_194_304);
        assert!(HEALTHCHECK_GUARD_MARGIN < DEFAULT_MAX_JOBS);
    }
}
