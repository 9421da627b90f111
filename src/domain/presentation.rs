use chrono::{DateTime, Utc};

use crate::domain::session::{SessionDuration, SessionRecord, SessionStatus};

pub const DEFAULT_DETAIL_ROUTE: &str = "SessionDetails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub title: String,
    pub detail_route: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "My Trips".to_string(),
            detail_route: DEFAULT_DETAIL_ROUTE.to_string(),
        }
    }
}

/// Navigation target attached to a card; carries the full record.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRoute {
    pub route_name: String,
    pub session: SessionRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCard {
    pub image_url: String,
    pub start_date: Option<DateTime<Utc>>,
    pub duration: Option<SessionDuration>,
    pub status: SessionStatus,
    pub num_of_incidents: u32,
    pub detail: DetailRoute,
}

pub fn present(records: &[SessionRecord], config: &DisplayConfig) -> Vec<SessionCard> {
    records
        .iter()
        .map(|record| SessionCard {
            image_url: record.image_url.clone(),
            start_date: record.start_date,
            duration: match record.status {
                SessionStatus::Completed => record.duration,
                _ => None,
            },
            status: record.status.clone(),
            num_of_incidents: record.num_of_incidents,
            detail: DetailRoute {
                route_name: config.detail_route.clone(),
                session: record.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::Map;

    use super::{DisplayConfig, present};
    use crate::domain::session::{SessionDuration, SessionRecord, SessionStatus};

    fn record(status: SessionStatus, duration: Option<SessionDuration>) -> SessionRecord {
        SessionRecord {
            image_url: "trip.png".to_string(),
            start_date: Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()),
            status,
            num_of_incidents: 4,
            duration,
            extra: Map::new(),
        }
    }

    #[test]
    fn maps_completed_record_with_duration() {
        let duration = SessionDuration {
            hours: 1,
            minutes: 30,
        };
        let source = record(SessionStatus::Completed, Some(duration));

        let cards = present(std::slice::from_ref(&source), &DisplayConfig::default());

        assert_eq!(cards.len(), 1);
        let card = &cards[0];
        assert_eq!(card.image_url, "trip.png");
        assert_eq!(card.start_date, source.start_date);
        assert_eq!(card.duration, Some(duration));
        assert_eq!(card.num_of_incidents, 4);
        assert_eq!(card.detail.route_name, "SessionDetails");
        assert_eq!(card.detail.session, source);
    }

    #[test]
    fn non_completed_cards_have_no_duration() {
        let stray = SessionDuration {
            hours: 9,
            minutes: 9,
        };
        let cards = present(
            &[
                record(SessionStatus::Active, Some(stray)),
                record(SessionStatus::Other("FAILED".to_string()), Some(stray)),
            ],
            &DisplayConfig::default(),
        );

        assert!(cards.iter().all(|card| card.duration.is_none()));
    }

    #[test]
    fn uses_configured_detail_route() {
        let config = DisplayConfig {
            detail_route: "TripDetails".to_string(),
            ..DisplayConfig::default()
        };

        let cards = present(&[record(SessionStatus::Active, None)], &config);

        assert_eq!(cards[0].detail.route_name, "TripDetails");
    }

    #[test]
    fn duration_formats_as_hours_and_minutes() {
        let duration = SessionDuration {
            hours: 2,
            minutes: 5,
        };
        assert_eq!(duration.to_string(), "2h 5m");
    }
}
