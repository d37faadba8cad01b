use chrono::{Datelike, Duration, NaiveDate};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Short weekday names indexed 0=Mon..6=Sun.
pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// static lookup table for day-name-keyed staffing maps
const DAY_NAME_TO_INDEX: [(&str, usize); 7] = [
    ("monday", 0),
    ("tuesday", 1),
    ("wednesday", 2),
    ("thursday", 3),
    ("friday", 4),
    ("saturday", 5),
    ("sunday", 6),
];

/// Maps a full English day name (case-insensitive) to its 0=Mon..6=Sun index.
pub fn day_index(name: &str) -> Option<usize> {
    let lower = name.to_ascii_lowercase();
    DAY_NAME_TO_INDEX
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, i)| *i)
}

/// An inclusive range of days an employee is away.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VacationPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl VacationPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in this period, counting both endpoints.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// An employee with their weekly availability pattern and vacations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Employee {
    pub name: String,
    pub team: String,
    /// Day-of-week indices the employee works at all: 0=Mon..6=Sun.
    pub available_days: Vec<usize>,
    #[serde(default)]
    pub vacations: Vec<VacationPeriod>,
}

impl Employee {
    pub fn is_available_on_weekday(&self, weekday: usize) -> bool {
        self.available_days.contains(&weekday)
    }

    pub fn is_on_vacation(&self, date: NaiveDate) -> bool {
        self.vacations.iter().any(|vac| vac.contains(date))
    }

    pub fn is_available_on(&self, date: NaiveDate, weekday: usize) -> bool {
        self.is_available_on_weekday(weekday) && !self.is_on_vacation(date)
    }

    pub fn is_full_time(&self) -> bool {
        self.available_days.len() == 7
    }
}

/// A team with a target share of all shifts and an optional weekday
/// on which no member works.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Team {
    pub name: String,
    pub target_percentage: f64,
    #[serde(default)]
    pub team_day: Option<usize>,
}

impl Team {
    pub fn is_team_day(&self, weekday: usize) -> bool {
        self.team_day == Some(weekday)
    }
}

/// Objective weights for the soft constraints. A weight of zero leaves
/// the corresponding rule unenforced.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub fairness: f64,
    pub team_deviation: f64,
    pub consecutive_shifts: f64,
    pub weekly_excess: f64,
    pub same_weekday: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            fairness: 1.0,
            team_deviation: 10_000.0,
            consecutive_shifts: 50.0,
            weekly_excess: 30.0,
            same_weekday: 10.0,
        }
    }
}

/// Required headcount per weekday, 0=Mon..6=Sun.
///
/// Deserializes from either a 7-element array in Mon..Sun order or a map
/// keyed by full day names ("monday": 2); days missing from a map default
/// to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffingRequirements([u32; 7]);

impl StaffingRequirements {
    pub fn new(per_day: [u32; 7]) -> Self {
        Self(per_day)
    }

    pub fn for_weekday(&self, weekday: usize) -> u32 {
        self.0[weekday]
    }

    pub fn weekly_total(&self) -> u32 {
        self.0.iter().sum()
    }
}

impl<'de> Deserialize<'de> for StaffingRequirements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            PerDay([u32; 7]),
            ByName(HashMap<String, u32>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::PerDay(days) => Ok(Self(days)),
            Repr::ByName(map) => {
                let mut days = [0u32; 7];
                for (name, count) in map {
                    let idx = day_index(&name).ok_or_else(|| {
                        serde::de::Error::custom(format!(
                            "unknown day name '{name}', expected monday..sunday"
                        ))
                    })?;
                    days[idx] = count;
                }
                Ok(Self(days))
            }
        }
    }
}

fn default_max_consecutive() -> u32 {
    3
}

fn default_max_weekly() -> u32 {
    5
}

fn default_avoid_same_weekday() -> bool {
    true
}

/// The complete input for one rostering run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    pub start_date: NaiveDate,
    pub duration_weeks: u32,
    pub staffing_requirements: StaffingRequirements,
    pub teams: Vec<Team>,
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub penalties: PenaltyWeights,
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive_shifts: u32,
    #[serde(default = "default_max_weekly")]
    pub max_shifts_per_week: u32,
    #[serde(default = "default_avoid_same_weekday")]
    pub avoid_same_weekday: bool,
}

impl ScheduleConfig {
    pub fn total_days(&self) -> usize {
        self.duration_weeks as usize * 7
    }

    /// Weekday index of the start date, 0=Mon.
    pub fn start_weekday(&self) -> usize {
        self.start_date.weekday().num_days_from_monday() as usize
    }

    pub fn weekday_of(&self, day_index: usize) -> usize {
        (self.start_weekday() + day_index) % 7
    }

    pub fn date_of(&self, day_index: usize) -> NaiveDate {
        self.start_date + Duration::days(day_index as i64)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(self.total_days() as i64 - 1)
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }

    /// Employees of one team, with their positions in the employee list.
    pub fn team_members<'a>(
        &'a self,
        team_name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Employee)> {
        self.employees
            .iter()
            .enumerate()
            .filter(move |(_, emp)| emp.team == team_name)
    }

    /// Checks the invariants an upstream loader is expected to have
    /// enforced already; the model builder refuses to run without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_weeks == 0 {
            return Err(ConfigError::EmptyHorizon);
        }
        if self.max_consecutive_shifts == 0 {
            return Err(ConfigError::ZeroConsecutiveCap);
        }

        let weights = [
            ("fairness", self.penalties.fairness),
            ("team_deviation", self.penalties.team_deviation),
            ("consecutive_shifts", self.penalties.consecutive_shifts),
            ("weekly_excess", self.penalties.weekly_excess),
            ("same_weekday", self.penalties.same_weekday),
        ];
        for (name, weight) in weights {
            if weight < 0.0 {
                return Err(ConfigError::NegativePenalty(name));
            }
        }

        let mut total_percentage = 0.0;
        for team in &self.teams {
            if !(0.0..=1.0).contains(&team.target_percentage) {
                return Err(ConfigError::PercentageOutOfRange {
                    team: team.name.clone(),
                    value: team.target_percentage,
                });
            }
            if let Some(day) = team.team_day {
                if day > 6 {
                    return Err(ConfigError::InvalidTeamDay {
                        team: team.name.clone(),
                        weekday: day,
                    });
                }
            }
            total_percentage += team.target_percentage;
        }
        if (total_percentage - 1.0).abs() > 0.01 {
            return Err(ConfigError::PercentageSum(total_percentage));
        }

        for emp in &self.employees {
            if self.team(&emp.team).is_none() {
                return Err(ConfigError::UnknownTeam {
                    employee: emp.name.clone(),
                    team: emp.team.clone(),
                });
            }
            for &day in &emp.available_days {
                if day > 6 {
                    return Err(ConfigError::InvalidWeekday {
                        employee: emp.name.clone(),
                        weekday: day,
                    });
                }
            }
            for vac in &emp.vacations {
                if vac.end < vac.start {
                    return Err(ConfigError::InvertedVacation {
                        employee: emp.name.clone(),
                        start: vac.start,
                        end: vac.end,
                    });
                }
            }
        }

        for team in &self.teams {
            if self.team_members(&team.name).next().is_none() {
                return Err(ConfigError::EmptyTeam(team.name.clone()));
            }
        }

        // vacations entirely outside the horizon are legal, just pointless
        let end = self.end_date();
        for emp in &self.employees {
            for vac in &emp.vacations {
                if vac.end < self.start_date || vac.start > end {
                    warn!(
                        "{}'s vacation {} to {} is outside planning period {} to {}",
                        emp.name, vac.start, vac.end, self.start_date, end
                    );
                }
            }
        }

        Ok(())
    }
}

/// A configuration that cannot produce a meaningful model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("planning horizon must be at least one week")]
    EmptyHorizon,
    #[error("max_consecutive_shifts must be at least 1")]
    ZeroConsecutiveCap,
    #[error("penalty weight '{0}' must not be negative")]
    NegativePenalty(&'static str),
    #[error("team '{team}' has target percentage {value} outside [0, 1]")]
    PercentageOutOfRange { team: String, value: f64 },
    #[error("team target percentages must sum to 1.0, got {0:.2}")]
    PercentageSum(f64),
    #[error("team '{team}' has invalid team day {weekday} (valid: 0=Mon..6=Sun)")]
    InvalidTeamDay { team: String, weekday: usize },
    #[error("employee '{employee}' belongs to undefined team '{team}'")]
    UnknownTeam { employee: String, team: String },
    #[error("employee '{employee}' lists invalid weekday {weekday} (valid: 0=Mon..6=Sun)")]
    InvalidWeekday { employee: String, weekday: usize },
    #[error("vacation for '{employee}' ends {end} before it starts {start}")]
    InvertedVacation {
        employee: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("team '{0}' has no employees assigned to it")]
    EmptyTeam(String),
}

/// Outcome of handing the model to the optimization engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
}

impl SolveStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::NotSolved => "Not Solved",
        };
        f.write_str(name)
    }
}

/// Who works on one specific day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyAssignment {
    pub day_index: usize,
    pub date: NaiveDate,
    pub day_of_week: String,
    pub employees: Vec<String>,
    pub required: u32,
    pub actual: u32,
}

/// One employee's slice of the finished roster, with violation statistics
/// recomputed from the assignment itself.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeSchedule {
    pub employee: Employee,
    pub assigned_days: Vec<usize>,
    pub ideal_shifts: f64,
    pub actual_shifts: u32,
    pub max_consecutive: u32,
    pub consecutive_violations: u32,
    pub weekly_shifts: Vec<u32>,
    pub weekly_violations: u32,
    pub same_weekday_violations: u32,
}

impl EmployeeSchedule {
    pub fn deviation(&self) -> f64 {
        self.actual_shifts as f64 - self.ideal_shifts
    }
}

/// Aggregate shift share of one team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    pub team: Team,
    pub target_shifts: f64,
    pub actual_shifts: f64,
    pub deviation: f64,
}

/// The complete result of one optimization run.
///
/// When `status` is not optimal the three breakdown lists are empty and
/// only `status`, `objective_value` and `total_shifts_required` carry
/// information.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResult {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub daily_assignments: Vec<DailyAssignment>,
    pub employee_schedules: Vec<EmployeeSchedule>,
    pub team_summaries: Vec<TeamSummary>,
    pub total_shifts_required: u32,
}

impl ScheduleResult {
    pub fn failed(status: SolveStatus, total_shifts_required: u32) -> Self {
        Self {
            status,
            objective_value: 0.0,
            daily_assignments: Vec::new(),
            employee_schedules: Vec::new(),
            team_summaries: Vec::new(),
            total_shifts_required,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    pub fn employee_schedule(&self, name: &str) -> Option<&EmployeeSchedule> {
        self.employee_schedules
            .iter()
            .find(|sched| sched.employee.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_config() -> ScheduleConfig {
        ScheduleConfig {
            start_date: date(2026, 1, 5), // a Monday
            duration_weeks: 1,
            staffing_requirements: StaffingRequirements::new([1, 1, 1, 1, 1, 0, 0]),
            teams: vec![
                Team {
                    name: "TeamA".into(),
                    target_percentage: 0.6,
                    team_day: None,
                },
                Team {
                    name: "TeamB".into(),
                    target_percentage: 0.4,
                    team_day: None,
                },
            ],
            employees: vec![
                Employee {
                    name: "Alice".into(),
                    team: "TeamA".into(),
                    available_days: vec![0, 1, 2, 3, 4],
                    vacations: vec![],
                },
                Employee {
                    name: "Bob".into(),
                    team: "TeamB".into(),
                    available_days: vec![0, 1, 2, 3, 4],
                    vacations: vec![],
                },
            ],
            penalties: PenaltyWeights::default(),
            max_consecutive_shifts: 3,
            max_shifts_per_week: 5,
            avoid_same_weekday: true,
        }
    }

    #[test]
    fn vacation_contains_is_inclusive() {
        let vac = VacationPeriod {
            start: date(2026, 1, 5),
            end: date(2026, 1, 10),
        };
        assert!(!vac.contains(date(2026, 1, 4)));
        assert!(vac.contains(date(2026, 1, 5)));
        assert!(vac.contains(date(2026, 1, 7)));
        assert!(vac.contains(date(2026, 1, 10)));
        assert!(!vac.contains(date(2026, 1, 11)));
    }

    #[test]
    fn vacation_duration_counts_both_endpoints() {
        let vac = VacationPeriod {
            start: date(2026, 1, 5),
            end: date(2026, 1, 9),
        };
        assert_eq!(vac.duration_days(), 5);
        let single = VacationPeriod {
            start: date(2026, 1, 5),
            end: date(2026, 1, 5),
        };
        assert_eq!(single.duration_days(), 1);
    }

    #[test]
    fn day_index_accepts_any_case() {
        assert_eq!(day_index("monday"), Some(0));
        assert_eq!(day_index("Sunday"), Some(6));
        assert_eq!(day_index("WEDNESDAY"), Some(2));
        assert_eq!(day_index("someday"), None);
    }

    #[test]
    fn staffing_deserializes_from_array() {
        let reqs: StaffingRequirements = serde_json::from_str("[2, 2, 2, 2, 2, 1, 0]").unwrap();
        assert_eq!(reqs.for_weekday(0), 2);
        assert_eq!(reqs.for_weekday(5), 1);
        assert_eq!(reqs.weekly_total(), 11);
    }

    #[test]
    fn staffing_deserializes_from_day_name_map() {
        let reqs: StaffingRequirements =
            serde_json::from_str(r#"{"monday": 2, "friday": 1}"#).unwrap();
        assert_eq!(reqs.for_weekday(0), 2);
        assert_eq!(reqs.for_weekday(4), 1);
        // unnamed days default to zero
        assert_eq!(reqs.for_weekday(6), 0);
    }

    #[test]
    fn staffing_rejects_unknown_day_name() {
        let parsed: Result<StaffingRequirements, _> = serde_json::from_str(r#"{"payday": 2}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ScheduleConfig = serde_json::from_str(
            r#"{
                "start_date": "2026-01-05",
                "duration_weeks": 2,
                "staffing_requirements": [1, 1, 1, 1, 1, 0, 0],
                "teams": [{"name": "T", "target_percentage": 1.0}],
                "employees": [
                    {"name": "Alice", "team": "T", "available_days": [0, 1, 2, 3, 4]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_consecutive_shifts, 3);
        assert_eq!(config.max_shifts_per_week, 5);
        assert!(config.avoid_same_weekday);
        assert_eq!(config.penalties.team_deviation, 10_000.0);
        assert_eq!(config.total_days(), 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn weekday_arithmetic_wraps_from_start_date() {
        let mut config = base_config();
        config.start_date = date(2026, 1, 7); // a Wednesday
        assert_eq!(config.start_weekday(), 2);
        assert_eq!(config.weekday_of(0), 2);
        assert_eq!(config.weekday_of(4), 6);
        assert_eq!(config.weekday_of(5), 0);
        assert_eq!(config.date_of(5), date(2026, 1, 12));
    }

    #[test]
    fn validate_accepts_base_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_weeks() {
        let mut config = base_config();
        config.duration_weeks = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyHorizon));
    }

    #[test]
    fn validate_rejects_zero_consecutive_cap() {
        let mut config = base_config();
        config.max_consecutive_shifts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroConsecutiveCap));
    }

    #[test]
    fn validate_rejects_negative_penalty() {
        let mut config = base_config();
        config.penalties.weekly_excess = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativePenalty("weekly_excess"))
        );
    }

    #[test]
    fn validate_rejects_percentage_out_of_range() {
        let mut config = base_config();
        config.teams[0].target_percentage = 1.4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PercentageOutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_percentages_not_summing_to_one() {
        let mut config = base_config();
        config.teams[1].target_percentage = 0.3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PercentageSum(_))
        ));
    }

    #[test]
    fn validate_accepts_percentage_sum_within_tolerance() {
        let mut config = base_config();
        config.teams[0].target_percentage = 0.595;
        config.teams[1].target_percentage = 0.4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_team_reference() {
        let mut config = base_config();
        config.employees[0].team = "Ghosts".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownTeam { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_team() {
        let mut config = base_config();
        config.employees[1].team = "TeamA".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyTeam("TeamB".into()))
        );
    }

    #[test]
    fn validate_rejects_invalid_weekday() {
        let mut config = base_config();
        config.employees[0].available_days.push(7);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeekday { .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_vacation() {
        let mut config = base_config();
        config.employees[0].vacations.push(VacationPeriod {
            start: date(2026, 1, 10),
            end: date(2026, 1, 5),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedVacation { .. })
        ));
    }

    #[test]
    fn solve_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&SolveStatus::NotSolved).unwrap(),
            "\"not-solved\""
        );
        assert_eq!(
            serde_json::to_string(&SolveStatus::Optimal).unwrap(),
            "\"optimal\""
        );
    }
}
