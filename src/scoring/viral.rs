use crate::Metrics;

/// Score returned when there are no views to normalise against.
pub const INSUFFICIENT_DATA_SCORE: u32 = 50;

const ENGAGEMENT_RATE_WEIGHT: f64 = 50.0;
const TRENDING_BONUS: f64 = 10.0;

/// Bounded 0-100 estimate of how likely a post is to take off.
///
/// Retweets weigh more than replies, replies more than likes. The rate is
/// taken over views and topped up by a view-volume bonus and an optional
/// trending bonus.
pub fn viral_potential(metrics: &Metrics, trending: bool) -> u32 {
    if metrics.views == 0 {
        return INSUFFICIENT_DATA_SCORE;
    }

    let interactions =
        2.0 * metrics.replies as f64 + 3.0 * metrics.retweets as f64 + metrics.likes as f64;
    let engagement_rate = interactions / metrics.views as f64;
    let trending_bonus = if trending { TRENDING_BONUS } else { 0.0 };
    let bonus = view_volume_bonus(metrics.views) + trending_bonus;

    let raw = (engagement_rate * ENGAGEMENT_RATE_WEIGHT + bonus).round();
    raw.clamp(0.0, 100.0) as u32
}

fn view_volume_bonus(views: u64) -> f64 {
    if views > 10_000 {
        30.0
    } else if views > 1_000 {
        20.0
    } else {
        10.0
    }
}
