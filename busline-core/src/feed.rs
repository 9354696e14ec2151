use async_trait::async_trait;
use busline_catalog::Trip;
use chrono::{DateTime, Utc};

/// Source of live bus positions.
#[async_trait]
pub trait LocationFeed: Send + Sync {
    /// `[lat, lng]` of the bus running `trip` at `now`, if known.
    async fn current_location(
        &self,
        trip: &Trip,
        now: DateTime<Utc>,
    ) -> Result<Option<[f64; 2]>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Places the bus along origin, stops and destination in proportion to the
/// elapsed share of the scheduled trip time.
#[derive(Debug, Default, Clone)]
pub struct RouteInterpolationFeed;

#[async_trait]
impl LocationFeed for RouteInterpolationFeed {
    async fn current_location(
        &self,
        trip: &Trip,
        now: DateTime<Utc>,
    ) -> Result<Option<[f64; 2]>, Box<dyn std::error::Error + Send + Sync>> {
        let total = (trip.end_time - trip.start_time).num_milliseconds();
        if total <= 0 {
            return Ok(None);
        }
        let elapsed = (now - trip.start_time).num_milliseconds();
        let progress = (elapsed as f64 / total as f64).clamp(0.0, 1.0);
        let points: Vec<[f64; 2]> = trip.route.waypoints().iter().map(|l| l.coords).collect();
        Ok(interpolate(&points, progress))
    }
}

/// Point at fraction `progress` of the polyline's length.
pub fn interpolate(points: &[[f64; 2]], progress: f64) -> Option<[f64; 2]> {
    let first = *points.first()?;
    let lengths: Vec<f64> = points.windows(2).map(|w| distance(w[0], w[1])).collect();
    let total: f64 = lengths.iter().sum();
    if total == 0.0 {
        return Some(first);
    }

    let mut remaining = progress.clamp(0.0, 1.0) * total;
    for (segment, len) in points.windows(2).zip(lengths) {
        if remaining <= len && len > 0.0 {
            let t = remaining / len;
            let [a_lat, a_lng] = segment[0];
            let [b_lat, b_lng] = segment[1];
            return Some([a_lat + (b_lat - a_lat) * t, a_lng + (b_lng - a_lng) * t]);
        }
        remaining -= len;
    }
    points.last().copied()
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_endpoints_and_midpoint() {
        let line = [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0]];
        assert_eq!(interpolate(&line, 0.0), Some([0.0, 0.0]));
        assert_eq!(interpolate(&line, 0.5), Some([0.0, 2.0]));
        assert_eq!(interpolate(&line, 0.75), Some([1.0, 2.0]));
        assert_eq!(interpolate(&line, 1.0), Some([2.0, 2.0]));
        assert_eq!(interpolate(&line, 3.0), Some([2.0, 2.0]));
    }

    #[test]
    fn test_interpolate_degenerate_routes() {
        assert_eq!(interpolate(&[], 0.5), None);
        assert_eq!(interpolate(&[[1.0, 1.0], [1.0, 1.0]], 0.5), Some([1.0, 1.0]));
    }
}
