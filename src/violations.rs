//! Pure scans over a finished 0/1 assignment. The solver's auxiliary
//! variables are only bounded from below, so every statistic reported to
//! callers is recomputed here from the assignment itself.

/// A maximal run of worked days that exceeded the consecutive cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunEpisode {
    /// First day index of the run.
    pub start: usize,
    /// Last day index of the run, inclusive.
    pub end: usize,
    pub length: u32,
}

/// Length of the longest consecutive run of worked days.
pub fn max_consecutive_run(assigned: &[bool]) -> u32 {
    let mut best = 0u32;
    let mut run = 0u32;
    for &worked in assigned {
        if worked {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// All maximal runs strictly longer than `max_consecutive`, including a
/// run that extends to the end of the horizon.
pub fn violation_episodes(assigned: &[bool], max_consecutive: u32) -> Vec<RunEpisode> {
    let mut episodes = Vec::new();
    let mut run = 0u32;
    let mut run_start = 0usize;

    for (k, &worked) in assigned.iter().enumerate() {
        if worked {
            if run == 0 {
                run_start = k;
            }
            run += 1;
        } else {
            if run > max_consecutive {
                episodes.push(RunEpisode {
                    start: run_start,
                    end: k - 1,
                    length: run,
                });
            }
            run = 0;
        }
    }
    if run > max_consecutive {
        episodes.push(RunEpisode {
            start: run_start,
            end: assigned.len() - 1,
            length: run,
        });
    }

    episodes
}

/// Number of violation episodes, one per maximal over-long run.
pub fn consecutive_episodes(assigned: &[bool], max_consecutive: u32) -> u32 {
    violation_episodes(assigned, max_consecutive).len() as u32
}

/// Worked-day count per 7-day block.
pub fn weekly_totals(assigned: &[bool]) -> Vec<u32> {
    assigned
        .chunks(7)
        .map(|week| week.iter().filter(|worked| **worked).count() as u32)
        .collect()
}

/// Number of weeks whose total exceeds `max_weekly`.
pub fn weeks_over_cap(weekly: &[u32], max_weekly: u32) -> u32 {
    weekly.iter().filter(|&&total| total > max_weekly).count() as u32
}

/// Number of (week pair, weekday) combinations where the same weekday is
/// worked in two back-to-back weeks.
pub fn same_weekday_repeats(assigned: &[bool]) -> u32 {
    let weeks = assigned.len() / 7;
    let mut repeats = 0;
    for w in 0..weeks.saturating_sub(1) {
        for d in 0..7 {
            if assigned[w * 7 + d] && assigned[(w + 1) * 7 + d] {
                repeats += 1;
            }
        }
    }
    repeats
}
