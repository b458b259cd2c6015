//! Discovery-gap computation as pure interval arithmetic. A per-contract
//! set of queried windows is stored compactly as an ordered list of
//! `[from, to]` intervals; this complements the merged set of
//! already-queried windows against `[from, to]`, in Rust rather than SQL —
//! the interval count per contract is small and this is clearer as a pure,
//! independently-testable function.

/// Merges overlapping/adjacent `[from, to]` (inclusive) intervals.
fn merge(mut windows: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    windows.sort_unstable_by_key(|w| w.0);
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(windows.len());
    for (from, to) in windows {
        match merged.last_mut() {
            Some((_, last_to)) if from <= last_to.saturating_add(1) => {
                *last_to = (*last_to).max(to);
            }
            _ => merged.push((from, to)),
        }
    }
    merged
}

/// Returns the inclusive `[from, to]` ranges within `[from, to]` not
/// covered by any window in `queried`.
pub fn missing_ranges(from: u64, to: u64, queried: &[(i64, i64)]) -> Vec<(u64, u64)> {
    if from > to {
        return Vec::new();
    }
    let windows: Vec<(u64, u64)> = queried
        .iter()
        .filter_map(|&(f, t)| (f >= 0 && t >= f).then(|| (f as u64, (t as u64).min(to))))
        .filter(|&(f, _)| f <= to)
        .collect();
    let merged = merge(windows);

    let mut gaps = Vec::new();
    let mut cursor = from;
    for (win_from, win_to) in merged {
        if win_from > cursor {
            gaps.push((cursor, win_from.saturating_sub(1).min(to)));
        }
        cursor = cursor.max(win_to.saturating_add(1));
        if cursor > to {
            break;
        }
    }
    if cursor <= to {
        gaps.push((cursor, to));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queried_yields_whole_range() {
        assert_eq!(missing_ranges(0, 100, &[]), vec![(0, 100)]);
    }

    #[test]
    fn fully_queried_yields_nothing() {
        assert_eq!(missing_ranges(0, 100, &[(0, 100)]), vec![]);
    }

    #[test]
    fn finds_single_gap_between_two_windows() {
        let queried = vec![(0, 10), (20, 30)];
        assert_eq!(missing_ranges(0, 30, &queried), vec![(11, 19)]);
    }

    #[test]
    fn finds_leading_and_trailing_gaps() {
        let queried = vec![(10, 20)];
        assert_eq!(missing_ranges(0, 30, &queried), vec![(0, 9), (21, 30)]);
    }

    #[test]
    fn merges_overlapping_and_adjacent_windows() {
        let queried = vec![(0, 10), (11, 20), (15, 25)];
        assert_eq!(missing_ranges(0, 25, &queried), vec![]);
    }

    #[test]
    fn ignores_windows_entirely_outside_range() {
        let queried = vec![(1000, 2000)];
        assert_eq!(missing_ranges(0, 100, &queried), vec![(0, 100)]);
    }
}
