//! Human-readable rendering of open appointment dates.

use time::Date;
use time::macros::format_description;

/// Formats one `YYYY-MM-DD` slot date as e.g. `"Jun 3"`.
///
/// Returns `None` for anything that is not a valid calendar date.
pub fn format_appointment_date(raw: &str) -> Option<String> {
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()?;
    let month = date.month().to_string();
    Some(format!("{} {}", &month[..3], date.day()))
}

/// Summarizes a list of slot dates for display.
///
/// One date reads `"Available on Jun 3"`; several read
/// `"Available between Jun 22 and Jul 27"` using the lexicographic
/// first/last, which for ISO dates is chronological order. Invalid entries
/// are ignored; an empty or all-invalid list yields an empty string.
pub fn format_appointments(appointments: &[String]) -> String {
    let mut formatted: Vec<(&String, String)> = appointments
        .iter()
        .filter_map(|raw| format_appointment_date(raw).map(|f| (raw, f)))
        .collect();

    match formatted.len() {
        0 => String::new(),
        1 => format!("Available on {}", formatted[0].1),
        _ => {
            formatted.sort_by(|a, b| a.0.cmp(b.0));
            format!(
                "Available between {} and {}",
                formatted[0].1,
                formatted[formatted.len() - 1].1
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_single_date() {
        assert_eq!(format_appointment_date("2006-06-03").unwrap(), "Jun 3");
        assert!(format_appointment_date("not-a-date").is_none());
    }

    #[test]
    fn test_formats_date_range() {
        let dates = vec![
            "2006-07-15".to_string(),
            "2006-06-22".to_string(),
            "2006-07-27".to_string(),
        ];
        assert_eq!(
            format_appointments(&dates),
            "Available between Jun 22 and Jul 27"
        );
    }

    #[test]
    fn test_single_entry_summary() {
        let dates = vec!["2006-06-03".to_string()];
        assert_eq!(format_appointments(&dates), "Available on Jun 3");
    }

    #[test]
    fn test_empty_and_invalid_lists() {
        assert_eq!(format_appointments(&[]), "");
        assert_eq!(format_appointments(&["garbage".to_string()]), "");
    }
}
