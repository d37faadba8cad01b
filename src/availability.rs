use crate::data::ScheduleConfig;

/// Per-employee, per-day availability grid derived from a config.
///
/// Row order matches `config.employees`; columns are day indices
/// 0..total_days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityMatrix {
    grid: Vec<Vec<bool>>,
}

impl AvailabilityMatrix {
    pub fn is_available(&self, employee: usize, day: usize) -> bool {
        self.grid[employee][day]
    }

    /// Total available days for one employee over the horizon.
    pub fn available_days(&self, employee: usize) -> u32 {
        self.grid[employee].iter().filter(|a| **a).count() as u32
    }
}

/// Derives the availability grid: a day counts as available unless it is
/// the employee's team-day, a weekday the employee never works, or inside
/// one of their vacation periods.
pub fn availability_matrix(config: &ScheduleConfig) -> AvailabilityMatrix {
    let days = config.total_days();
    let grid = config
        .employees
        .iter()
        .map(|emp| {
            let team_day = config.team(&emp.team).and_then(|t| t.team_day);
            (0..days)
                .map(|k| {
                    let weekday = config.weekday_of(k);
                    if team_day == Some(weekday) {
                        false
                    } else {
                        emp.is_available_on(config.date_of(k), weekday)
                    }
                })
                .collect()
        })
        .collect();
    AvailabilityMatrix { grid }
}

/// Number of shift slots to fill over the whole horizon. This sums the
/// daily requirement alone; who is available does not enter into it.
pub fn total_required_shifts(config: &ScheduleConfig) -> u32 {
    (0..config.total_days())
        .map(|k| config.staffing_requirements.for_weekday(config.weekday_of(k)))
        .sum()
}

/// Fair target shift count per employee: each team's target share of the
/// total, split among members in proportion to their available days.
/// A team with no available days at all yields an ideal of 0 for every
/// member.
pub fn ideal_shares(config: &ScheduleConfig, matrix: &AvailabilityMatrix) -> Vec<f64> {
    let total_required = total_required_shifts(config) as f64;
    let mut ideals = vec![0.0; config.employees.len()];

    for team in &config.teams {
        let members: Vec<usize> = config.team_members(&team.name).map(|(i, _)| i).collect();
        let team_availability: u32 = members.iter().map(|&i| matrix.available_days(i)).sum();
        if team_availability == 0 {
            continue;
        }

        let team_target = team.target_percentage * total_required;
        for &i in &members {
            ideals[i] = matrix.available_days(i) as f64 / team_availability as f64 * team_target;
        }
    }

    ideals
}
