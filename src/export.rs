use crate::dates::days_in_month;
use crate::errors::LedgerError;
use crate::ledger::Ledger;
use crate::models::Member;
use crate::stats::month_grid;
use std::fmt::Write;

const BOM: char = '\u{feff}';

/// Monthly attendance sheet: one row per member per track, a column per
/// day with that day's attended count, then attended and no-show totals.
pub fn render_month_csv(
    members: &[Member],
    ledger: &Ledger,
    year: i32,
    month: u32,
) -> Result<String, LedgerError> {
    let day_count = days_in_month(year, month)?;
    let rows = month_grid(members, ledger, year, month)?;

    // fmt::Write into a String is infallible.
    let mut out = String::new();
    out.push(BOM);
    out.push_str("Member,Track");
    for day in 1..=day_count {
        let _ = write!(out, ",{month}/{day}");
    }
    out.push_str(",Attended,NoShow\n");

    for row in rows {
        out.push_str(&escape_field(&row.name));
        out.push(',');
        out.push_str(row.track.as_str());
        for counts in &row.days {
            let _ = write!(out, ",{}", counts.attended);
        }
        let _ = writeln!(out, ",{},{}", row.totals.attended, row.totals.no_show);
    }
    Ok(out)
}

pub fn export_file_name(year: i32, month: u32) -> String {
    format!("attendance_{year:04}_{month:02}.csv")
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, Track};

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            joined_at: "2026-01-01".to_string(),
            is_staff: false,
            is_leader: false,
            previous_names: Vec::new(),
        }
    }

    #[test]
    fn csv_has_header_and_two_rows_per_member() {
        let mut ledger = Ledger::default();
        ledger
            .attendance_mut(Track::InPerson)
            .entry("2026-02-03".to_string())
            .or_default()
            .insert(
                "a".to_string(),
                [Status::Attended, Status::NoShow, Status::Unset, Status::Unset],
            );
        crate::mutations::set_metadata(&mut ledger, Track::InPerson, "2026-02-03", &[], &[], 2);

        let csv = render_month_csv(&[member("a", "Kim, Alice")], &ledger, 2026, 2).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\u{feff}Member,Track,2/1,2/2,2/3"));
        assert!(lines[0].ends_with("2/28,Attended,NoShow"));

        let in_person: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(lines[1].split(',').count(), 2 + 1 + 28 + 2);
        assert_eq!(in_person[0], "\"Kim");
        assert_eq!(in_person[2], "in_person");
        assert_eq!(in_person[5], "1");
        assert!(lines[1].ends_with(",1,1"));
        assert!(lines[2].ends_with(",0,0"));
    }

    #[test]
    fn empty_roster_still_gets_a_header() {
        let csv = render_month_csv(&[], &Ledger::default(), 2026, 4).unwrap();
        assert!(csv.trim_end().ends_with("4/30,Attended,NoShow"));
        assert!(render_month_csv(&[], &Ledger::default(), 2026, 13).is_err());
    }

    #[test]
    fn escaping_quotes_fields() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a \"b\""), "\"a \"\"b\"\"\"");
    }
}
