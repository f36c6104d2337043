//! Dashboard statistics

use crate::detections::DetectionEvent;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Number of calendar days in the trend, today included
pub const TREND_DAYS: i64 = 7;

/// Aggregate figures for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    /// Every event the tenant owns
    pub total_events: u64,
    /// Events not yet resolved
    pub unresolved_count: u64,
    /// Per camera, busiest first
    pub camera_stats: Vec<CameraCount>,
    /// One entry per day, oldest first
    pub recent_trend: Vec<DailyCount>,
}

/// Events from one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CameraCount {
    /// Camera identifier
    pub camera_id: String,
    /// Event count
    pub count: u64,
}

/// Events on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Event count, zero for quiet days
    pub count: u64,
}

impl DashboardStats {
    /// Aggregate one tenant's events as of `now`
    pub fn compute(events: &[DetectionEvent], now: DateTime<Utc>) -> Self {
        let total_events = events.len() as u64;
        let unresolved_count = events.iter().filter(|e| !e.is_resolved).count() as u64;

        let mut per_camera: HashMap<&str, u64> = HashMap::new();
        for event in events {
            *per_camera.entry(event.camera_id.as_str()).or_default() += 1;
        }
        let mut camera_stats: Vec<CameraCount> = per_camera
            .into_iter()
            .map(|(camera_id, count)| CameraCount { camera_id: camera_id.to_string(), count })
            .collect();
        camera_stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.camera_id.cmp(&b.camera_id)));

        Self {
            total_events,
            unresolved_count,
            camera_stats,
            recent_trend: daily_trend(events, now.date_naive()),
        }
    }
}

fn daily_trend(events: &[DetectionEvent], today: NaiveDate) -> Vec<DailyCount> {
    let first_day = today - Duration::days(TREND_DAYS - 1);

    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    for event in events {
        let day = event.timestamp.date_naive();
        if day >= first_day && day <= today {
            *per_day.entry(day).or_default() += 1;
        }
    }

    (0..TREND_DAYS)
        .map(|offset| {
            let day = first_day + Duration::days(offset);
            DailyCount {
                date: day.format("%Y-%m-%d").to_string(),
                count: per_day.get(&day).copied().unwrap_or(0),
            }
        })
        .collect()
}
