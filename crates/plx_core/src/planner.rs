//! Workload planning: derive execution tuning from batch size.
//!
//! Larger batches get longer inter-item delays, smaller chunks, and the
//! resilient worker strategy. The planner is consulted once at job
//! creation to fill any option the caller did not supply.

use crate::models::{JobOptionOverrides, JobOptions, Strategy};

/// Derive execution options for a batch of `item_count` items.
///
/// Always returns a value; an empty batch is rejected before planning by
/// job creation.
pub fn plan(item_count: usize) -> JobOptions {
    JobOptions {
        delay_seconds: optimal_delay(item_count),
        chunk_size: optimal_chunk_size(item_count),
        strategy: if item_count > 10 {
            Strategy::Advanced
        } else {
            Strategy::Basic
        },
    }
}

/// Fill unset override fields from the plan for this batch size.
pub fn resolve(item_count: usize, overrides: JobOptionOverrides) -> JobOptions {
    let planned = plan(item_count);
    JobOptions {
        delay_seconds: overrides.delay_seconds.unwrap_or(planned.delay_seconds),
        chunk_size: overrides.chunk_size.unwrap_or(planned.chunk_size),
        strategy: overrides.strategy.unwrap_or(planned.strategy),
    }
}

fn optimal_delay(item_count: usize) -> u32 {
    if item_count <= 5 {
        3
    } else if item_count <= 10 {
        5
    } else if item_count <= 20 {
        8
    } else {
        10
    }
}

fn optimal_chunk_size(item_count: usize) -> u32 {
    if item_count <= 10 {
        item_count as u32
    } else if item_count <= 30 {
        5
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batches_run_basic_unchunked() {
        let options = plan(5);
        assert_eq!(options.delay_seconds, 3);
        assert_eq!(options.chunk_size, 5);
        assert_eq!(options.strategy, Strategy::Basic);

        let options = plan(10);
        assert_eq!(options.delay_seconds, 5);
        assert_eq!(options.chunk_size, 10);
        assert_eq!(options.strategy, Strategy::Basic);
    }

    #[test]
    fn medium_batches_run_advanced() {
        let options = plan(15);
        assert_eq!(options.delay_seconds, 8);
        assert_eq!(options.chunk_size, 5);
        assert_eq!(options.strategy, Strategy::Advanced);

        let options = plan(25);
        assert_eq!(options.delay_seconds, 10);
        assert_eq!(options.chunk_size, 5);
        assert_eq!(options.strategy, Strategy::Advanced);
    }

    #[test]
    fn large_batches_get_conservative_tuning() {
        let options = plan(35);
        assert_eq!(options.delay_seconds, 10);
        assert_eq!(options.chunk_size, 4);
        assert_eq!(options.strategy, Strategy::Advanced);
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(plan(6).delay_seconds, 5);
        assert_eq!(plan(11).delay_seconds, 8);
        assert_eq!(plan(11).strategy, Strategy::Advanced);
        assert_eq!(plan(20).delay_seconds, 8);
        assert_eq!(plan(21).delay_seconds, 10);
        assert_eq!(plan(30).chunk_size, 5);
        assert_eq!(plan(31).chunk_size, 4);
    }

    #[test]
    fn overrides_win_over_plan() {
        let overrides = JobOptionOverrides {
            delay_seconds: Some(1),
            chunk_size: None,
            strategy: Some(Strategy::Advanced),
        };
        let options = resolve(5, overrides);
        assert_eq!(options.delay_seconds, 1);
        assert_eq!(options.chunk_size, 5);
        assert_eq!(options.strategy, Strategy::Advanced);
    }
}
