//! Nearest-neighbor alignment of an episode onto the canonical time grid.
//!
//! Actions are never interpolated: every output step is a copy of exactly one
//! native step.

const TIME_EPS: f64 = 1e-9;

/// Largest gap between consecutive recorded timestamps, in native periods.
/// Keeps the number of grid ticks proportional to the number of steps.
pub(crate) const MAX_GAP_PERIODS: f64 = 10_000.0;

/// Native step times: recorded timestamps when every step has one, otherwise
/// `index / native_hz`. Returns the index of the first step whose timestamp
/// is non-finite, goes backwards, or jumps more than [`MAX_GAP_PERIODS`]
/// past its predecessor, with the reason.
pub(crate) fn step_times(
    timestamps: &[Option<f64>],
    native_hz: f64,
) -> Result<Vec<f64>, (usize, String)> {
    if !timestamps.is_empty() && timestamps.iter().all(Option::is_some) {
        let max_gap = MAX_GAP_PERIODS / native_hz;
        let mut times: Vec<f64> = Vec::with_capacity(timestamps.len());
        for (i, &t) in timestamps.iter().flatten().enumerate() {
            if !t.is_finite() {
                return Err((i, format!("non-finite timestamp {t}")));
            }
            if let Some(&prev) = times.last() {
                if t < prev {
                    return Err((i, format!("timestamp {t} precedes {prev}")));
                }
                if t - prev > max_gap {
                    return Err((i, format!("gap of {}s exceeds {max_gap}s", t - prev)));
                }
            }
            times.push(t);
        }
        return Ok(times);
    }
    Ok((0..timestamps.len()).map(|i| i as f64 / native_hz).collect())
}

/// For each tick of the `target_hz` grid starting at the first native time
/// and not past the last, the index of the nearest native step. Ties go to
/// the earlier step. Stops after `limit` ticks when one is given. `times`
/// must be non-decreasing.
pub(crate) fn nearest_indices(times: &[f64], target_hz: f64, limit: Option<usize>) -> Vec<usize> {
    let Some((&start, &end)) = times.first().zip(times.last()) else {
        return Vec::new();
    };

    let mut picked = Vec::new();
    let mut cursor = 0;
    for tick in 0usize.. {
        if limit.is_some_and(|limit| picked.len() >= limit) {
            break;
        }
        let t = start + tick as f64 / target_hz;
        if t > end + TIME_EPS {
            break;
        }
        while cursor + 1 < times.len() && (times[cursor + 1] - t).abs() < (times[cursor] - t).abs() {
            cursor += 1;
        }
        picked.push(cursor);
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, hz: f64) -> Vec<f64> {
        step_times(&vec![None; n], hz).unwrap()
    }

    #[test]
    fn same_rate_is_identity() {
        assert_eq!(nearest_indices(&grid(5, 10.0), 10.0, None), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn downsample_by_two_takes_every_other_step() {
        assert_eq!(
            nearest_indices(&grid(16, 20.0), 10.0, None),
            vec![0, 2, 4, 6, 8, 10, 12, 14]
        );
    }

    #[test]
    fn upsample_repeats_steps() {
        let picked = nearest_indices(&grid(3, 5.0), 10.0, None);
        assert_eq!(picked.len(), 5);
        assert_eq!(picked.first(), Some(&0));
        assert_eq!(picked.last(), Some(&2));
        assert!(picked.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn single_step_maps_to_itself() {
        assert_eq!(nearest_indices(&grid(1, 3.0), 10.0, None), vec![0]);
    }

    #[test]
    fn recorded_timestamps_take_precedence() {
        let stamps = vec![Some(0.0), Some(0.1), Some(0.35), Some(0.4)];
        let times = step_times(&stamps, 1000.0).unwrap();
        assert_eq!(nearest_indices(&times, 10.0, None), vec![0, 1, 1, 2, 3]);
    }

    #[test]
    fn backwards_timestamps_are_rejected() {
        let stamps = vec![Some(0.0), Some(0.2), Some(0.1)];
        assert!(matches!(step_times(&stamps, 10.0), Err((2, _))));
    }

    #[test]
    fn limit_stops_the_grid_early() {
        let picked = nearest_indices(&grid(100, 10.0), 10.0, Some(4));
        assert_eq!(picked, vec![0, 1, 2, 3]);

        // A long span within the gap allowance still yields `limit` ticks.
        let times = step_times(&[Some(0.0), Some(400.0)], 20.0).unwrap();
        assert_eq!(nearest_indices(&times, 10.0, Some(5)), vec![0; 5]);
    }

    #[test]
    fn oversized_gaps_are_rejected() {
        let stamps = vec![Some(0.0), Some(2.0e7)];
        assert!(matches!(step_times(&stamps, 20.0), Err((1, _))));

        let within = vec![Some(0.0), Some(MAX_GAP_PERIODS / 20.0)];
        assert!(step_times(&within, 20.0).is_ok());
    }
}
