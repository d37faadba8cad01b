use crate::availability;
use crate::data::{ScheduleConfig, ScheduleResult, DAY_NAMES};
use crate::violations;
use itertools::Itertools;
use std::fmt::Write;

/// Renders the full scheduling report as plain text. With `quiet` only the
/// header and the daily schedule are included.
pub fn render_report(config: &ScheduleConfig, result: &ScheduleResult, quiet: bool) -> String {
    let mut out = String::new();

    header(&mut out, config, result);
    if !result.is_optimal() {
        failure_guidance(&mut out);
        return out;
    }

    daily_schedule(&mut out, result);
    if !quiet {
        employee_summary(&mut out, config, result);
        team_summary(&mut out, result);
        availability_patterns(&mut out, config, result);
        vacation_summary(&mut out, result);
        consecutive_violations(&mut out, config, result);
    }

    out
}

fn title(out: &mut String, text: &str) {
    let rule = "=".repeat(80);
    let _ = writeln!(out, "{rule}\n{text}\n{rule}");
}

fn header(out: &mut String, config: &ScheduleConfig, result: &ScheduleResult) {
    title(out, "SHIFT SCHEDULE OPTIMIZATION RESULTS");
    let _ = writeln!(out, "\nStatus: {}", result.status);
    let _ = writeln!(out, "Objective Value: {:.2}", result.objective_value);
    let _ = writeln!(
        out,
        "Planning Period: {} to {}",
        config.start_date,
        config.end_date()
    );
    let _ = writeln!(
        out,
        "Total Shifts Required: {}\n",
        result.total_shifts_required
    );
}

fn failure_guidance(out: &mut String) {
    out.push_str("\nNO OPTIMAL SOLUTION FOUND!\n");
    out.push_str("\nPossible reasons:\n");
    out.push_str("  - Part-time availability conflicts with staffing requirements\n");
    out.push_str("  - Team distribution targets are impossible with current constraints\n");
    out.push_str("  - Too many vacation conflicts\n");
    out.push_str("\nSuggestions:\n");
    out.push_str("  - Review vacation schedules for conflicts\n");
    out.push_str("  - Check if part-time employees have sufficient availability\n");
    out.push_str("  - Consider adjusting team target percentages\n");
    out.push_str("  - Verify staffing requirements are realistic\n");
}

fn daily_schedule(out: &mut String, result: &ScheduleResult) {
    title(out, "DAILY SCHEDULE");
    for day in &result.daily_assignments {
        let employees = day.employees.join(", ");
        let _ = writeln!(
            out,
            "Day {:2} ({} {}): {:40} [Required: {}]",
            day.day_index + 1,
            day.date,
            day.day_of_week,
            employees,
            day.required
        );
    }
    out.push('\n');
}

fn employee_summary(out: &mut String, config: &ScheduleConfig, result: &ScheduleResult) {
    title(out, "EMPLOYEE SUMMARY");
    let matrix = availability::availability_matrix(config);

    let _ = writeln!(
        out,
        "{:12} {:10} {:>6} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>8}",
        "Employee", "Team", "Avail", "Ideal", "Actual", "Dev", "MaxRun", "RunViol", "WkViol", "SameDay"
    );
    for schedule in &result.employee_schedules {
        let available = config
            .employees
            .iter()
            .position(|e| e.name == schedule.employee.name)
            .map(|i| matrix.available_days(i))
            .unwrap_or(0);
        let _ = writeln!(
            out,
            "{:12} {:10} {:>6} {:>7.2} {:>7} {:>7.2} {:>7} {:>7} {:>7} {:>8}",
            schedule.employee.name,
            schedule.employee.team,
            available,
            schedule.ideal_shifts,
            schedule.actual_shifts,
            schedule.deviation(),
            schedule.max_consecutive,
            schedule.consecutive_violations,
            schedule.weekly_violations,
            schedule.same_weekday_violations
        );
    }
    out.push('\n');
}

fn team_summary(out: &mut String, result: &ScheduleResult) {
    title(out, "TEAM SUMMARY");
    let total = result.total_shifts_required as f64;

    let _ = writeln!(
        out,
        "{:12} {:>9} {:>9} {:>14} {:>14} {:>10}",
        "Team", "Target %", "Actual %", "Target Shifts", "Actual Shifts", "Deviation"
    );
    for summary in &result.team_summaries {
        let actual_pct = if total > 0.0 {
            summary.actual_shifts / total * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "{:12} {:>9.1} {:>9.1} {:>14.2} {:>14.2} {:>10.2}",
            summary.team.name,
            summary.team.target_percentage * 100.0,
            actual_pct,
            summary.target_shifts,
            summary.actual_shifts,
            summary.deviation
        );
    }
    out.push('\n');
}

fn availability_patterns(out: &mut String, config: &ScheduleConfig, result: &ScheduleResult) {
    title(out, "AVAILABILITY PATTERNS");

    let by_team = result
        .employee_schedules
        .iter()
        .map(|schedule| (schedule.employee.team.as_str(), schedule))
        .into_group_map();

    for team in &config.teams {
        let _ = writeln!(out, "\n  Team {}:", team.name);
        if let Some(day) = team.team_day {
            let _ = writeln!(
                out,
                "    Team Day: {} (no {} staff work on {}s)",
                DAY_NAMES[day], team.name, DAY_NAMES[day]
            );
        }

        for schedule in by_team.get(team.name.as_str()).into_iter().flatten() {
            let emp = &schedule.employee;
            let status = if emp.is_full_time() {
                "Full-time"
            } else {
                "Part-time"
            };
            let day_names = emp
                .available_days
                .iter()
                .filter(|&&d| d < 7)
                .map(|&d| DAY_NAMES[d])
                .join(", ");
            let _ = writeln!(out, "    {:10} ({:10}): {}", emp.name, status, day_names);
        }
    }
    out.push('\n');
}

fn vacation_summary(out: &mut String, result: &ScheduleResult) {
    title(out, "VACATION SCHEDULE");

    let mut has_vacations = false;
    for schedule in &result.employee_schedules {
        let emp = &schedule.employee;
        if emp.vacations.is_empty() {
            continue;
        }
        has_vacations = true;
        let _ = writeln!(out, "\n  {}:", emp.name);
        for vac in &emp.vacations {
            if vac.start == vac.end {
                let _ = writeln!(out, "    - {}", vac.start);
            } else {
                let _ = writeln!(
                    out,
                    "    - {} to {} ({} days)",
                    vac.start,
                    vac.end,
                    vac.duration_days()
                );
            }
        }
    }

    if !has_vacations {
        out.push_str("\n  No vacations scheduled for this period\n");
    }
    out.push('\n');
}

fn consecutive_violations(out: &mut String, config: &ScheduleConfig, result: &ScheduleResult) {
    title(out, "CONSECUTIVE SHIFT VIOLATIONS");

    let total_days = config.total_days();
    let mut any = false;
    for schedule in &result.employee_schedules {
        let mut assigned = vec![false; total_days];
        for &day in &schedule.assigned_days {
            if day < total_days {
                assigned[day] = true;
            }
        }
        let episodes = violations::violation_episodes(&assigned, config.max_consecutive_shifts);
        if episodes.is_empty() {
            continue;
        }

        any = true;
        let _ = writeln!(out, "\n  {}:", schedule.employee.name);
        for episode in episodes {
            let _ = writeln!(
                out,
                "    {} consecutive shifts: Day {} ({}) to Day {} ({})",
                episode.length,
                episode.start + 1,
                DAY_NAMES[config.weekday_of(episode.start)],
                episode.end + 1,
                DAY_NAMES[config.weekday_of(episode.end)]
            );
        }
    }

    if !any {
        out.push_str("\n  No consecutive shift violations\n");
    }
    out.push('\n');
}
