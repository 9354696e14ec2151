use busline_catalog::Trip;
use chrono::NaiveDate;
use serde::Deserialize;

/// `GET /api/trips/search?from&to&date`
#[derive(Debug, Clone, Deserialize)]
pub struct TripQuery {
    pub from: String,
    pub to: String,
    pub date: NaiveDate, // UTC calendar day of departure
}

impl TripQuery {
    /// Origin/destination compare case-insensitively; only trips that still
    /// run are returned.
    pub fn matches(&self, trip: &Trip) -> bool {
        trip.status.is_bookable()
            && trip.route.origin.name.eq_ignore_ascii_case(self.from.trim())
            && trip.route.destination.name.eq_ignore_ascii_case(self.to.trim())
            && trip.start_time.date_naive() == self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserialization() {
        let json = r#"{"from": "Hubli", "to": "Bengaluru", "date": "2024-12-25"}"#;
        let query: TripQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(query.from, "Hubli");
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }
}
