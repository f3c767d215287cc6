/// Parse a number written in Turkish notation (`1.234.567,89`).
///
/// A comma is always the decimal separator. Without a comma, dots are
/// thousands separators only when every group after the first has exactly
/// three digits (`12.500`), otherwise a single dot is read as a decimal
/// point (`45.5`).
pub fn parse_turkish_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replacen(',', ".", 1)
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_thousands_grouped(s: &str) -> bool {
    let mut groups = s.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && (1..=3).contains(&head.len())
        && rest.iter().all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}
