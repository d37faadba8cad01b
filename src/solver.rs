use crate::availability;
use crate::data::{
    ConfigError, DailyAssignment, EmployeeSchedule, ScheduleConfig, ScheduleResult, SolveStatus,
    TeamSummary, DAY_NAMES,
};
use crate::violations;
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{info, trace};
use std::time::Instant;
use thiserror::Error;

/// A failed optimization run. Infeasible or unbounded models are NOT
/// errors; they come back as a `ScheduleResult` with the matching status.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// Builds the roster ILP for the given configuration, solves it with the
/// HiGHS backend, and extracts the audited schedule.
pub fn solve(config: &ScheduleConfig) -> Result<ScheduleResult, SolveError> {
    config.validate()?;
    let start_time = Instant::now();

    let days = config.total_days();
    let weeks = config.duration_weeks as usize;
    let employee_count = config.employees.len();
    let team_count = config.teams.len();

    // derived inputs
    let matrix = availability::availability_matrix(config);
    let total_required = availability::total_required_shifts(config);
    let total_f = f64::from(total_required);
    let ideals = availability::ideal_shares(config, &matrix);

    info!(
        "Setting up ILP model with {} employees, {} teams, and {} days...",
        employee_count, team_count, days
    );
    let mut problem = ProblemVariables::new();

    // x[e][k] =  1 if employee e works day k
    //            0 otherwise
    let x: Vec<Vec<Variable>> = (0..employee_count)
        .map(|_| problem.add_vector(variable().binary(), days))
        .collect();

    // S[e]: shifts worked by employee e over the horizon
    let shift_counts: Vec<Variable> =
        problem.add_vector(variable().integer().min(0).max(total_f), employee_count);

    // S_t[t] and D_t[t]: team shift count and its distance from target
    let team_counts: Vec<Variable> = problem.add_vector(variable().min(0).max(total_f), team_count);
    let team_deviations: Vec<Variable> =
        problem.add_vector(variable().min(0).max(total_f), team_count);

    // Z[e]: distance between S[e] and the employee's ideal share
    let fairness_slacks: Vec<Variable> = problem.add_vector(variable().min(0), employee_count);

    // C[e][k]: flags a window of max_consecutive+1 days worked through;
    // one variable per window start that fits in the horizon
    let window = config.max_consecutive_shifts as usize + 1;
    let window_starts = if days >= window { days - window + 1 } else { 0 };
    let consecutive_flags: Vec<Vec<Variable>> = (0..employee_count)
        .map(|_| problem.add_vector(variable().binary(), window_starts))
        .collect();

    // W[e][w]: shifts beyond the weekly cap in week w
    let weekly_excess: Vec<Vec<Variable>> = (0..employee_count)
        .map(|_| problem.add_vector(variable().integer().min(0).max(7), weeks))
        .collect();

    // R[e][w][d]: weekday d worked in both week w and week w+1
    let repeat_rule = config.avoid_same_weekday && weeks >= 2;
    let repeat_flags: Option<Vec<Vec<Vec<Variable>>>> = repeat_rule.then(|| {
        (0..employee_count)
            .map(|_| {
                (0..weeks - 1)
                    .map(|_| problem.add_vector(variable().binary(), 7))
                    .collect()
            })
            .collect()
    });

    trace!(
        "Declared {} assignment variables plus auxiliaries for {} soft constraints.",
        employee_count * days,
        if repeat_rule { 4 } else { 3 }
    );

    // objective: every slack variable enters with a non-negative weight,
    // so minimization pins each one to its violation amount
    let penalties = &config.penalties;
    let fairness_sum: Expression = fairness_slacks.iter().copied().sum();
    let team_deviation_sum: Expression = team_deviations.iter().copied().sum();
    let consecutive_sum: Expression = consecutive_flags.iter().flatten().copied().sum();
    let weekly_sum: Expression = weekly_excess.iter().flatten().copied().sum();

    let mut objective = penalties.fairness * fairness_sum
        + penalties.team_deviation * team_deviation_sum
        + penalties.consecutive_shifts * consecutive_sum
        + penalties.weekly_excess * weekly_sum;
    if let Some(flags) = &repeat_flags {
        let repeat_sum: Expression = flags.iter().flatten().flatten().copied().sum();
        objective += penalties.same_weekday * repeat_sum;
    }
    let objective_expr = objective.clone();

    let mut model = problem
        .minimise(objective)
        .using(default_solver);

    // begin hard constraints

    // every day is staffed with exactly the required headcount
    for k in 0..days {
        let staffed: Expression = (0..employee_count).map(|e| x[e][k]).sum();
        let required = f64::from(config.staffing_requirements.for_weekday(config.weekday_of(k)));
        model.add_constraint(constraint!(staffed == required));
    }

    // nobody works a day they are unavailable
    let mut locked = 0usize;
    for e in 0..employee_count {
        for k in 0..days {
            if !matrix.is_available(e, k) {
                model.add_constraint(constraint!(x[e][k] == 0));
                locked += 1;
            }
        }
    }
    trace!("Locked {locked} unavailable (employee, day) pairs to zero.");

    // link per-employee and per-team counts to the assignment
    for e in 0..employee_count {
        let worked: Expression = x[e].iter().copied().sum();
        model.add_constraint(constraint!(shift_counts[e] == worked));
    }
    for (t, team) in config.teams.iter().enumerate() {
        let members: Expression = config
            .team_members(&team.name)
            .map(|(e, _)| shift_counts[e])
            .sum();
        model.add_constraint(constraint!(team_counts[t] == members));
    }

    // begin soft constraints; each bound only pushes the slack variable
    // up, never fixes it, so none of these can cause infeasibility

    // fairness: Z[e] ends up at |S[e] - ideal[e]|
    for e in 0..employee_count {
        let ideal = ideals[e];
        model.add_constraint(constraint!(fairness_slacks[e] >= ideal - shift_counts[e]));
        model.add_constraint(constraint!(fairness_slacks[e] >= shift_counts[e] - ideal));
    }

    // team deviation: D_t[t] ends up at |S_t[t] - target|
    for (t, team) in config.teams.iter().enumerate() {
        let target = team.target_percentage * total_f;
        model.add_constraint(constraint!(team_deviations[t] >= target - team_counts[t]));
        model.add_constraint(constraint!(team_deviations[t] >= team_counts[t] - target));
    }

    // consecutive runs: a window of cap+1 days summing past the cap
    // forces its flag to 1
    let consecutive_cap = f64::from(config.max_consecutive_shifts);
    for e in 0..employee_count {
        for k in 0..window_starts {
            let in_window: Expression = (k..k + window).map(|j| x[e][j]).sum();
            model.add_constraint(constraint!(
                consecutive_flags[e][k] >= in_window - consecutive_cap
            ));
        }
    }

    // weekly excess: W[e][w] absorbs shifts beyond the weekly cap
    let weekly_cap = f64::from(config.max_shifts_per_week);
    for e in 0..employee_count {
        for w in 0..weeks {
            let in_week: Expression = (w * 7..(w + 1) * 7).map(|k| x[e][k]).sum();
            model.add_constraint(constraint!(weekly_excess[e][w] >= in_week - weekly_cap));
        }
    }

    // same weekday in back-to-back weeks
    if let Some(flags) = &repeat_flags {
        for e in 0..employee_count {
            for w in 0..weeks - 1 {
                for d in 0..7 {
                    model.add_constraint(constraint!(
                        flags[e][w][d] >= x[e][w * 7 + d] + x[e][(w + 1) * 7 + d] - 1
                    ));
                }
            }
        }
    }

    // solve
    info!("Starting ILP solver...");
    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            info!("Model is infeasible.");
            return Ok(ScheduleResult::failed(
                SolveStatus::Infeasible,
                total_required,
            ));
        }
        Err(ResolutionError::Unbounded) => {
            info!("Model is unbounded.");
            return Ok(ScheduleResult::failed(
                SolveStatus::Unbounded,
                total_required,
            ));
        }
        Err(other) => return Err(SolveError::Backend(other.to_string())),
    };
    info!("Solution found in {:.2?}", start_time.elapsed());

    Ok(extract_result(
        config,
        &ideals,
        total_required,
        &solution,
        &x,
        &team_counts,
        &team_deviations,
        &objective_expr,
    ))
}

/// Turns the raw variable values into the audited result structure.
///
/// Violation statistics come from re-scanning the rounded assignment; the
/// C/W/R variables are only bounded from below and their solved values are
/// not trustworthy when their weight is zero.
#[allow(clippy::too_many_arguments)]
fn extract_result(
    config: &ScheduleConfig,
    ideals: &[f64],
    total_required: u32,
    solution: &impl Solution,
    x: &[Vec<Variable>],
    team_counts: &[Variable],
    team_deviations: &[Variable],
    objective: &Expression,
) -> ScheduleResult {
    let days = config.total_days();

    let mut daily_assignments = Vec::with_capacity(days);
    for k in 0..days {
        let weekday = config.weekday_of(k);
        let employees: Vec<String> = config
            .employees
            .iter()
            .enumerate()
            .filter(|(e, _)| solution.value(x[*e][k]) > 0.5)
            .map(|(_, emp)| emp.name.clone())
            .collect();

        daily_assignments.push(DailyAssignment {
            day_index: k,
            date: config.date_of(k),
            day_of_week: DAY_NAMES[weekday].to_string(),
            required: config.staffing_requirements.for_weekday(weekday),
            actual: employees.len() as u32,
            employees,
        });
    }

    let mut employee_schedules = Vec::with_capacity(config.employees.len());
    for (e, emp) in config.employees.iter().enumerate() {
        let assigned: Vec<bool> = (0..days).map(|k| solution.value(x[e][k]) > 0.5).collect();
        let assigned_days: Vec<usize> = assigned
            .iter()
            .enumerate()
            .filter(|(_, worked)| **worked)
            .map(|(k, _)| k)
            .collect();
        let weekly_shifts = violations::weekly_totals(&assigned);

        employee_schedules.push(EmployeeSchedule {
            employee: emp.clone(),
            actual_shifts: assigned_days.len() as u32,
            assigned_days,
            ideal_shifts: ideals[e],
            max_consecutive: violations::max_consecutive_run(&assigned),
            consecutive_violations: violations::consecutive_episodes(
                &assigned,
                config.max_consecutive_shifts,
            ),
            weekly_violations: violations::weeks_over_cap(
                &weekly_shifts,
                config.max_shifts_per_week,
            ),
            weekly_shifts,
            same_weekday_violations: violations::same_weekday_repeats(&assigned),
        });
    }

    // S_t and D_t may be read straight off the solver: the deviation pair
    // is hard-linked to the assignment and always carries a penalty
    let mut team_summaries = Vec::with_capacity(config.teams.len());
    for (t, team) in config.teams.iter().enumerate() {
        team_summaries.push(TeamSummary {
            team: team.clone(),
            target_shifts: team.target_percentage * f64::from(total_required),
            actual_shifts: solution.value(team_counts[t]),
            deviation: solution.value(team_deviations[t]),
        });
    }

    ScheduleResult {
        status: SolveStatus::Optimal,
        objective_value: solution.eval(objective),
        daily_assignments,
        employee_schedules,
        team_summaries,
        total_shifts_required: total_required,
    }
}
