//! Memory scorer: one of the four dimensions fused into a process
//! verdict. Flags processes holding unusually large resident memory.

use super::DimensionScore;

const RSS_THRESHOLD_BYTES: u64 = 500 * 1024 * 1024;
const CONFIDENCE_FACTOR: f64 = 0.5;

pub fn score(rss_bytes: Option<u64>) -> DimensionScore {
    let Some(rss) = rss_bytes else {
        return DimensionScore::default();
    };
    if rss > RSS_THRESHOLD_BYTES {
        DimensionScore::capped(
            0.2,
            CONFIDENCE_FACTOR,
            vec![format!("resident set size {:.0} MiB exceeds 500 MiB", rss as f64 / 1024.0 / 1024.0)],
        )
    } else {
        DimensionScore::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_rss_triggers_fixed_contribution() {
        let result = score(Some(600 * 1024 * 1024));
        assert_eq!(result.score, 0.2);
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn low_rss_scores_zero() {
        let result = score(Some(10 * 1024 * 1024));
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn missing_rss_degrades_to_zero() {
        let result = score(None);
        assert_eq!(result.score, 0.0);
    }
}
