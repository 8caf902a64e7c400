/// Splits a second count into hours, minutes and seconds
///
/// Takes whole hours off while more than 3599 seconds remain, then whole
/// minutes while more than 59 remain, so the result is always normalized
/// (never `0h120m0s`).
pub fn split_elapsed(seconds: u64) -> (u64, u64, u64) {
    let mut remaining = seconds;
    let (mut hours, mut minutes) = (0, 0);

    while remaining > 59 {
        if remaining > 3599 {
            remaining -= 3600;
            hours += 1;
        } else {
            remaining -= 60;
            minutes += 1;
        }
    }

    (hours, minutes, remaining)
}

/// Formats elapsed seconds as `[H]h Mm Ss` without spaces, e.g. `1h1m1s`
///
/// The hour segment only shows up once at least one hour has passed.
pub fn format_elapsed(seconds: u64) -> String {
    let (hours, minutes, seconds) = split_elapsed(seconds);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else {
        format!("{minutes}m{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_reference_values() {
        let cases = [
            (0, "0m0s"),
            (59, "0m59s"),
            (60, "1m0s"),
            (61, "1m1s"),
            (3599, "59m59s"),
            (3600, "1h0m0s"),
            (3661, "1h1m1s"),
            (7261, "2h1m1s"),
        ];
        for (seconds, expected) in cases {
            assert_eq!(format_elapsed(seconds), expected, "for {seconds}s");
        }
    }

    #[test]
    fn split_is_always_normalized() {
        for seconds in (0..20_000).step_by(7) {
            let (h, m, s) = split_elapsed(seconds);
            assert!(m < 60 && s < 60);
            assert_eq!(h * 3600 + m * 60 + s, seconds);
        }
    }

    #[test]
    fn long_sessions_keep_counting_hours() {
        assert_eq!(format_elapsed(100 * 3600 + 5), "100h0m5s");
    }
}
