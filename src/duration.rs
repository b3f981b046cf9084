/// Formats a number of seconds as text, e.g. `1 hour, 1 minute, and 1 second`.
///
/// Fractional seconds are dropped unless the whole duration is under one
/// second, in which case it is printed with millisecond precision.
pub fn human_readable_duration(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let whole = total as u64;
    let hours = whole / 3600;
    let minutes = whole / 60 % 60;
    let secs = whole % 60;

    if hours == 0 && minutes == 0 && secs == 0 {
        return format!("{total:.3} seconds");
    }

    let mut hours_part = unit(hours, "hour");
    let mut minutes_part = unit(minutes, "minute");
    let mut seconds_part = unit(secs, "second");

    if hours != 0 && (minutes != 0 || secs != 0) {
        hours_part.push_str(", ");
    }
    if minutes != 0 && secs != 0 {
        minutes_part.push_str(", ");
    }
    if secs != 0 && (hours != 0 || minutes != 0) {
        seconds_part.insert_str(0, "and ");
    } else if minutes != 0 && hours != 0 {
        minutes_part.insert_str(0, "and ");
    }

    format!("{hours_part}{minutes_part}{seconds_part}")
}

fn unit(value: u64, name: &str) -> String {
    match value {
        0 => String::new(),
        1 => format!("1 {name}"),
        n => format!("{n} {name}s"),
    }
}
