use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?\s*$",
    )
    .unwrap()
});
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,3}):([0-5]\d)\b").unwrap());
static HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:hours?|hrs?|h)\b").unwrap());
static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:minutes?|mins?|m)\b").unwrap());
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").unwrap());

/// Parse a recipe duration into whole minutes.
///
/// Accepts ISO-8601 style `P[n]DT[n]H[n]M[n]S` first, then loose text:
/// `H:MM`, `N hours [and] M minutes`, `N hours`, `N minutes` or a bare integer.
/// Returns `None` when nothing matches or the total is not positive.
pub fn parse_duration_minutes(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let minutes = parse_iso(trimmed).or_else(|| parse_loose(trimmed))?;
    if minutes > 0 {
        Some(minutes)
    } else {
        None
    }
}

fn parse_iso(text: &str) -> Option<u32> {
    let caps = ISO_DURATION.captures(text)?;
    // "P" or "PT" alone carries no duration
    if (1..=4).all(|i| caps.get(i).is_none()) {
        return None;
    }

    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let total = (part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0).round();
    if total > f64::from(u32::MAX) {
        return None;
    }
    Some(total as u32)
}

fn parse_loose(text: &str) -> Option<u32> {
    if let Some(caps) = CLOCK.captures(text) {
        let hours: u32 = caps[1].parse().ok()?;
        let minutes: u32 = caps[2].parse().ok()?;
        return hours.checked_mul(60)?.checked_add(minutes);
    }

    let hours = HOURS
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok());
    let minutes = MINUTES
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok());
    if hours.is_some() || minutes.is_some() {
        return hours.unwrap_or(0).checked_mul(60)?.checked_add(minutes.unwrap_or(0));
    }

    BARE_NUMBER
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_durations() {
        assert_eq!(parse_duration_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_duration_minutes("PT45M"), Some(45));
        assert_eq!(parse_duration_minutes("P1DT2H"), Some(1560));
        assert_eq!(parse_duration_minutes("PT5400S"), Some(90));
        assert_eq!(parse_duration_minutes("PT5400.0S"), Some(90));
        assert_eq!(parse_duration_minutes("pt20m"), Some(20));
    }

    #[test]
    fn test_loose_durations() {
        assert_eq!(parse_duration_minutes("1:30"), Some(90));
        assert_eq!(parse_duration_minutes("2 hours"), Some(120));
        assert_eq!(parse_duration_minutes("1 hour and 15 minutes"), Some(75));
        assert_eq!(parse_duration_minutes("1 hr 5 mins"), Some(65));
        assert_eq!(parse_duration_minutes("25 minutes"), Some(25));
        assert_eq!(parse_duration_minutes("40"), Some(40));
    }

    #[test]
    fn test_unparsable_or_zero() {
        assert_eq!(parse_duration_minutes("about a while"), None);
        assert_eq!(parse_duration_minutes(""), None);
        assert_eq!(parse_duration_minutes("PT"), None);
        assert_eq!(parse_duration_minutes("PT0M"), None);
        assert_eq!(parse_duration_minutes("0"), None);
    }

    #[test]
    fn test_out_of_range_totals() {
        assert_eq!(parse_duration_minutes("80000000 hours"), None);
        assert_eq!(parse_duration_minutes("99999999999 minutes"), None);
        assert_eq!(parse_duration_minutes("P3000000000D"), None);
        assert_eq!(parse_duration_minutes("P3000000D"), None);
        assert_eq!(parse_duration_minutes("P2000000D"), Some(2_880_000_000));
    }
}
