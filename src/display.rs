//! Pure display helpers shared by the render surface.

/// Emphasis tier for a navigation dot, derived from how far its index sits
/// from the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DotTier {
    Active,
    Adjacent,
    Distant,
}

impl DotTier {
    pub fn for_index(index: usize, current: usize) -> Self {
        match index.abs_diff(current) {
            0 => DotTier::Active,
            1 => DotTier::Adjacent,
            _ => DotTier::Distant,
        }
    }

    /// Dot glyph width in terminal cells, largest for the active tier.
    pub fn glyph(self) -> &'static str {
        match self {
            DotTier::Active => "●",
            DotTier::Adjacent => "◉",
            DotTier::Distant => "·",
        }
    }
}

/// Formats a duration in seconds as `M:SS` with zero-padded seconds and
/// unbounded minutes. Negative or non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    let mins = total / 60;
    let secs = total % 60;
    format!("{}:{:02}", mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_matches_index_distance() {
        for current in 0..6usize {
            for index in 0..6usize {
                let tier = DotTier::for_index(index, current);
                match index.abs_diff(current) {
                    0 => assert_eq!(tier, DotTier::Active),
                    1 => assert_eq!(tier, DotTier::Adjacent),
                    _ => assert_eq!(tier, DotTier::Distant),
                }
            }
        }
    }

    #[test]
    fn formats_zero_padded_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(7.9), "0:07");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(600.0), "10:00");
    }

    #[test]
    fn minutes_are_unbounded() {
        assert_eq!(format_time(3725.0), "62:05");
    }

    #[test]
    fn rejects_non_finite_input() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
