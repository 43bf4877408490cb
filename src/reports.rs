// Report Service - deterministic daily movement summaries.
//
// Output ordering contract: configured areas first, in configured order,
// each present even with zero events; then any area that only exists in
// the day's recorded events, alphabetically.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::StorageError;
use crate::movements::{MovementEvent, MovementService};

/// One area's movements for a day, events ascending by `recorded_at`.
#[derive(Debug, Clone, Serialize)]
pub struct MovementSummary {
    pub area: String,
    pub events: Vec<MovementEvent>,
}

impl MovementSummary {
    fn empty(area: &str) -> MovementSummary {
        MovementSummary {
            area: area.to_string(),
            events: Vec::new(),
        }
    }
}

/// Generates movement summaries.
#[derive(Clone)]
pub struct ReportService {
    movements: MovementService,
    areas: Vec<String>,
}

impl ReportService {
    pub fn new(movements: MovementService, areas: Vec<String>) -> Self {
        ReportService { movements, areas }
    }

    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// The day's events grouped by area: configured areas first (empty
    /// ones included), leftover recorded areas appended alphabetically.
    pub fn summarize(
        &self,
        target_date: NaiveDate,
    ) -> Result<Vec<MovementSummary>, StorageError> {
        let events = self.movements.events_for_date(target_date)?;

        // The store returns (area, recorded_at) order, so each area's
        // sequence stays time-ordered as it is split out here. BTreeMap
        // keys give the alphabetical order for step two.
        let mut grouped: BTreeMap<String, Vec<MovementEvent>> = BTreeMap::new();
        for event in events {
            grouped.entry(event.area.clone()).or_default().push(event);
        }

        let mut ordered = Vec::with_capacity(self.areas.len() + grouped.len());
        for area in &self.areas {
            match grouped.remove(area) {
                Some(events) => ordered.push(MovementSummary {
                    area: area.clone(),
                    events,
                }),
                None => ordered.push(MovementSummary::empty(area)),
            }
        }
        // Areas recorded historically but no longer configured
        for (area, events) in grouped {
            ordered.push(MovementSummary { area, events });
        }

        Ok(ordered)
    }

    /// `{date, areas: [{area, events: [...]}]}` - the shape the report
    /// page and the JSON endpoint both consume.
    pub fn summary_as_json(
        &self,
        target_date: NaiveDate,
    ) -> Result<serde_json::Value, StorageError> {
        let summaries = self.summarize(target_date)?;
        Ok(serde_json::json!({
            "date": target_date.to_string(),
            "areas": summaries,
        }))
    }
}

/// Parses a `YYYY-MM-DD` report date argument. `None` for absent or
/// malformed input; callers fall back to today.
pub fn parse_report_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MovementStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn movements() -> MovementService {
        MovementService::new(MovementStore::open_in_memory().unwrap())
    }

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, h, m, s).unwrap()
    }

    fn target_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
    }

    #[test]
    fn test_configured_areas_first_then_leftovers_alphabetically() {
        let movements = movements();
        movements
            .record_event_at("A", "Wellbeing", "in", None, Some(ts(9, 0, 0)))
            .unwrap();
        movements
            .record_event_at("B", "Library", "in", None, Some(ts(10, 0, 0)))
            .unwrap();

        let reports = ReportService::new(
            movements,
            vec!["Reception".to_string(), "Wellbeing".to_string()],
        );
        let summaries = reports.summarize(target_date()).unwrap();

        let areas: Vec<&str> = summaries.iter().map(|s| s.area.as_str()).collect();
        assert_eq!(areas, vec!["Reception", "Wellbeing", "Library"]);
        assert!(summaries[0].events.is_empty());
        assert_eq!(summaries[1].events.len(), 1);
        assert_eq!(summaries[2].events.len(), 1);
    }

    #[test]
    fn test_no_configured_areas_yields_recorded_areas_alphabetically() {
        let movements = movements();
        movements
            .record_event_at("A", "Wellbeing", "in", None, Some(ts(9, 0, 0)))
            .unwrap();
        movements
            .record_event_at("B", "Library", "in", None, Some(ts(10, 0, 0)))
            .unwrap();

        let reports = ReportService::new(movements, Vec::new());
        let summaries = reports.summarize(target_date()).unwrap();

        let areas: Vec<&str> = summaries.iter().map(|s| s.area.as_str()).collect();
        assert_eq!(areas, vec!["Library", "Wellbeing"]);
    }

    #[test]
    fn test_no_events_yields_configured_empty_summaries() {
        let reports = ReportService::new(
            movements(),
            vec!["Reception".to_string(), "Wellbeing".to_string()],
        );
        let summaries = reports.summarize(target_date()).unwrap();

        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.events.is_empty()));

        let bare = ReportService::new(movements(), Vec::new());
        assert!(bare.summarize(target_date()).unwrap().is_empty());
    }

    #[test]
    fn test_record_then_summarize_includes_event_exactly_once() {
        let movements = movements();
        movements
            .record_event_at("Jane Doe", "Reception", "in", Some("ab12"), Some(ts(9, 0, 0)))
            .unwrap();

        let reports = ReportService::new(movements, vec!["Reception".to_string()]);
        let summaries = reports.summarize(target_date()).unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].area, "Reception");
        assert_eq!(summaries[0].events.len(), 1);
        assert_eq!(summaries[0].events[0].name, "Jane Doe");
    }

    #[test]
    fn test_same_day_events_keep_insertion_order() {
        let movements = movements();
        movements
            .record_event_at("Jane Doe", "Reception", "in", Some("ab12"), Some(ts(9, 0, 0)))
            .unwrap();
        movements
            .record_event_at("Jane Doe", "Reception", "out", Some("ab12"), Some(ts(17, 0, 0)))
            .unwrap();

        let reports = ReportService::new(movements, vec!["Reception".to_string()]);
        let summaries = reports.summarize(target_date()).unwrap();

        let directions: Vec<&str> = summaries[0]
            .events
            .iter()
            .map(|e| e.direction.as_str())
            .collect();
        assert_eq!(directions, vec!["IN", "OUT"]);
    }

    #[test]
    fn test_summary_json_shape() {
        let movements = movements();
        movements
            .record_event_at("Jane Doe", "Reception", "in", None, Some(ts(9, 0, 0)))
            .unwrap();

        let reports = ReportService::new(movements, vec!["Reception".to_string()]);
        let value = reports.summary_as_json(target_date()).unwrap();

        assert_eq!(value["date"], "2026-03-04");
        assert_eq!(value["areas"][0]["area"], "Reception");
        assert_eq!(value["areas"][0]["events"][0]["name"], "Jane Doe");
        assert_eq!(value["areas"][0]["events"][0]["direction"], "IN");
    }

    #[test]
    fn test_parse_report_date() {
        assert_eq!(
            parse_report_date(Some("2026-03-04")),
            NaiveDate::from_ymd_opt(2026, 3, 4)
        );
        assert_eq!(
            parse_report_date(Some(" 2026-03-04 ")),
            NaiveDate::from_ymd_opt(2026, 3, 4)
        );
        assert_eq!(parse_report_date(Some("04/03/2026")), None);
        assert_eq!(parse_report_date(Some("not-a-date")), None);
        assert_eq!(parse_report_date(None), None);
    }
}
