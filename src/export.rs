use crate::data::ScheduleResult;
use itertools::Itertools;
use std::fmt::Write;

/// Produces an export document from a finished schedule. One implementation
/// per output format.
pub trait Exporter {
    fn export(&self, result: &ScheduleResult) -> String;
}

/// Quotes a CSV field when it needs quoting, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields.iter().map(|f| csv_field(f)).join(",")
}

/// Three-column CSV: `Date,Day_of_Week,Employee`, one row per assignment.
#[derive(Debug, Default)]
pub struct SimpleCsv;

impl Exporter for SimpleCsv {
    fn export(&self, result: &ScheduleResult) -> String {
        let mut out = String::from("Date,Day_of_Week,Employee\n");
        for day in &result.daily_assignments {
            for name in &day.employees {
                let _ = writeln!(
                    out,
                    "{}",
                    csv_row(&[
                        day.date.to_string(),
                        day.day_of_week.clone(),
                        name.clone()
                    ])
                );
            }
        }
        out
    }
}

/// Matrix CSV: one column per date, employees grouped by team in config
/// order (alphabetical within a team), a marker per assigned day, and a
/// TOTAL row of spreadsheet COUNTIF formulas over the data rows.
#[derive(Debug)]
pub struct MatrixCsv {
    pub shift_marker: String,
}

impl Default for MatrixCsv {
    fn default() -> Self {
        Self {
            shift_marker: "X".into(),
        }
    }
}

impl Exporter for MatrixCsv {
    fn export(&self, result: &ScheduleResult) -> String {
        let dates: Vec<_> = result.daily_assignments.iter().map(|d| d.date).collect();

        // employee name -> assigned day indices
        let assigned: std::collections::HashMap<&str, Vec<usize>> = result
            .employee_schedules
            .iter()
            .map(|s| (s.employee.name.as_str(), s.assigned_days.clone()))
            .collect();

        let by_team = result
            .employee_schedules
            .iter()
            .map(|s| (s.employee.team.as_str(), s.employee.name.as_str()))
            .into_group_map();

        let mut rows: Vec<String> = Vec::new();

        let mut header = vec!["Employee".to_string()];
        for (day, date) in result.daily_assignments.iter().zip(&dates) {
            header.push(format!("{} {}", date, day.day_of_week));
        }
        rows.push(csv_row(&header));

        // team sections, row numbers are 1-based with the header as row 1
        for summary in &result.team_summaries {
            let mut team_header = vec![format!("--- {} ---", summary.team.name)];
            team_header.extend(std::iter::repeat_n(String::new(), dates.len()));
            rows.push(csv_row(&team_header));

            let mut names = by_team
                .get(summary.team.name.as_str())
                .cloned()
                .unwrap_or_default();
            names.sort_unstable();

            for name in names {
                let days = assigned.get(name).cloned().unwrap_or_default();
                let mut row = vec![name.to_string()];
                for k in 0..dates.len() {
                    row.push(if days.contains(&k) {
                        self.shift_marker.clone()
                    } else {
                        String::new()
                    });
                }
                rows.push(csv_row(&row));
            }
        }

        let last_data_row = rows.len(); // header row is row 1
        let mut total_row = vec!["TOTAL".to_string()];
        for column in 0..dates.len() {
            let letter = column_letter(column + 1);
            total_row.push(format!(
                "=COUNTIF({letter}2:{letter}{last_data_row},\"{}\")",
                self.shift_marker
            ));
        }
        rows.push(csv_row(&total_row));

        let mut out = rows.join("\n");
        out.push('\n');
        out
    }
}

/// 0-based column index to a spreadsheet column letter (A, B, .., Z, AA, ..).
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    index += 1;
    while index > 0 {
        index -= 1;
        letters.push(b'A' + (index % 26) as u8);
        index /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ASCII letters")
}
