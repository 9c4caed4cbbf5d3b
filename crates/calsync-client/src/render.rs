//! Output rendering for the calendar list.

use calsync_core::CalendarEntry;

const MISSING: &str = "-";

/// Renders calendars as an aligned text table of id, summary and access role.
///
/// The primary calendar is marked in the summary column.
pub fn render_table(calendars: &[CalendarEntry]) -> String {
    if calendars.is_empty() {
        return "No calendars found.".to_string();
    }

    let rows: Vec<[String; 3]> = calendars
        .iter()
        .map(|cal| {
            let summary = cal.summary().unwrap_or(MISSING);
            let summary = if cal.is_primary() {
                format!("{} (primary)", summary)
            } else {
                summary.to_string()
            };
            [
                cal.id().unwrap_or(MISSING).to_string(),
                summary,
                cal.access_role().unwrap_or(MISSING).to_string(),
            ]
        })
        .collect();

    let header = ["ID".to_string(), "SUMMARY".to_string(), "ROLE".to_string()];
    let id_width = column_width(&header, &rows, 0);
    let summary_width = column_width(&header, &rows, 1);

    std::iter::once(&header)
        .chain(rows.iter())
        .map(|[id, summary, role]| {
            format!("{id:<id_width$}  {summary:<summary_width$}  {role}")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn column_width(header: &[String; 3], rows: &[[String; 3]], column: usize) -> usize {
    rows.iter()
        .map(|row| row[column].chars().count())
        .chain(std::iter::once(header[column].len()))
        .max()
        .unwrap_or(0)
}

/// Renders the calendar entries unchanged, as a pretty-printed JSON array.
pub fn render_json(calendars: &[CalendarEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(calendars)
}
