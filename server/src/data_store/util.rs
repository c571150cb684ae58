use super::models::{BookingDetails, TableStatus};
use std::cmp::Ordering;

/// Compare two strings in "natural" order: Runs of ASCII digits are compared by their numeric
/// value, everything else character by character (case-insensitive first, then case-sensitive as
/// tie-breaker).
///
/// This makes "Table A2" sort before "Table A10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();
    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let a_digits = take_digits(&mut a_chars);
                let b_digits = take_digits(&mut b_chars);
                let ordering = compare_digit_runs(&a_digits, &b_digits);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(ca), Some(cb)) => {
                let ordering = ca.to_lowercase().cmp(cb.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut result = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        result.push(c);
    }
    result
}

/// Compare two non-empty strings of ASCII digits by their numeric value, without parsing them (to
/// support arbitrary lengths). Leading zeros are ignored for the value, but "07" > "7" as
/// tie-breaker.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Sort table statuses by hall name, then by natural order of the table name
pub fn sort_table_statuses(statuses: &mut [TableStatus]) {
    statuses.sort_by(|a, b| {
        natural_cmp(&a.hall_name, &b.hall_name)
            .then_with(|| natural_cmp(&a.table_name, &b.table_name))
            .then_with(|| a.table_id.cmp(&b.table_id))
    });
}

/// Sort bookings by date (`newest_first` or oldest first), then by natural order of the table name
pub fn sort_booking_details(bookings: &mut [BookingDetails], newest_first: bool) {
    bookings.sort_by(|a, b| {
        let date_ordering = a.booking.booking_date.cmp(&b.booking.booking_date);
        if newest_first {
            date_ordering.reverse()
        } else {
            date_ordering
        }
        .then_with(|| natural_cmp(&a.table_name, &b.table_name))
        .then_with(|| a.booking.id.cmp(&b.booking.id))
    });
}
