//! RoastTime data import
//!
//! Reads roast logs exported by the Aillio Bullet's RoastTime application
//! (one JSON file per roast, named by uid) from a configured directory and
//! surfaces the telemetry the roast entry form can pull in: weights,
//! temperatures, first crack, timings.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use shared::lot::RoastLevel;

use crate::error::{AppError, AppResult};

/// RoastTime import service reading a directory of roast JSON files
#[derive(Clone)]
pub struct RoastImportService {
    roasts_dir: PathBuf,
}

/// Parsed RoastTime roast log
#[derive(Debug, Clone, Serialize)]
pub struct RoastTimeRoast {
    pub roasttime_uid: String,
    pub roast_name: String,
    pub roast_date: Option<DateTime<Utc>>,
    pub green_weight_g: f64,
    pub roasted_weight_g: f64,
    pub weight_loss_percent: f64,
    pub preheat_temp: Option<f64>,
    pub charge_temp: Option<f64>,
    pub drop_temp: Option<f64>,
    pub first_crack_time: Option<i64>,
    pub first_crack_temp: Option<f64>,
    pub total_roast_time: Option<i64>,
    pub ambient_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub roast_number: Option<i64>,
}

/// Summary statistics over every imported roast
#[derive(Debug, Clone, Serialize)]
pub struct RoastTimeSummary {
    pub count: usize,
    pub total_green_kg: f64,
    pub total_roasted_kg: f64,
    pub avg_weight_loss_percent: f64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Raw RoastTime file layout. Weights arrive as numbers or strings
/// depending on the app version, so those fields coerce.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRoast {
    uid: String,
    roast_name: Option<String>,
    /// Epoch milliseconds
    date_time: Option<i64>,
    #[serde(deserialize_with = "flexible_f64")]
    weight_green: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    weight_roasted: Option<f64>,
    preheat_temperature: Option<f64>,
    bean_charge_temperature: Option<f64>,
    bean_drop_temperature: Option<f64>,
    /// Samples per second; usually 2
    sample_rate: Option<f64>,
    total_roast_time: Option<f64>,
    index_first_crack_start: Option<i64>,
    bean_temperature: Vec<f64>,
    ambient: Option<f64>,
    humidity: Option<f64>,
    roast_number: Option<i64>,
}

fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn parse_raw(raw: RawRoast) -> RoastTimeRoast {
    let green = raw.weight_green.unwrap_or(0.0);
    let roasted = raw.weight_roasted.unwrap_or(0.0);
    let weight_loss = if green > 0.0 {
        (green - roasted) / green * 100.0
    } else {
        0.0
    };

    let roast_date = raw
        .date_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    let sample_rate = raw.sample_rate.filter(|r| *r > 0.0).unwrap_or(2.0);
    let fc_index = raw.index_first_crack_start.filter(|i| *i > 0);
    let first_crack_time = fc_index.map(|i| (i as f64 / sample_rate) as i64);
    let first_crack_temp = fc_index
        .and_then(|i| raw.bean_temperature.get(i as usize))
        .map(|t| (t * 10.0).round() / 10.0);

    RoastTimeRoast {
        roasttime_uid: raw.uid,
        roast_name: raw.roast_name.unwrap_or_else(|| "Unknown".to_string()),
        roast_date,
        green_weight_g: green,
        roasted_weight_g: roasted,
        weight_loss_percent: (weight_loss * 100.0).round() / 100.0,
        preheat_temp: raw.preheat_temperature,
        charge_temp: raw.bean_charge_temperature,
        drop_temp: raw.bean_drop_temperature,
        first_crack_time,
        first_crack_temp,
        total_roast_time: raw.total_roast_time.map(|t| t as i64),
        ambient_temp: raw.ambient,
        humidity: raw.humidity,
        roast_number: raw.roast_number,
    }
}

/// Guess the roast level (V, K, S) from a RoastTime log.
///
/// Name hints win; otherwise weight loss and drop temperature bands:
/// light ~11-13% loss / drop under 210, dark above 15% / drop over 220.
pub fn guess_roast_level(roast: &RoastTimeRoast) -> RoastLevel {
    let name = roast.roast_name.to_lowercase();
    if name.contains("light") || name.contains("világos") {
        return RoastLevel::Light;
    }
    if name.contains("dark") || name.contains("sötét") {
        return RoastLevel::Dark;
    }
    if name.contains("medium") || name.contains("közép") {
        return RoastLevel::Medium;
    }

    let loss = roast.weight_loss_percent;
    let drop = roast.drop_temp.unwrap_or(0.0);

    if loss < 13.0 || drop < 210.0 {
        RoastLevel::Light
    } else if loss > 15.0 || drop > 220.0 {
        RoastLevel::Dark
    } else {
        RoastLevel::Medium
    }
}

impl RoastImportService {
    /// Create a new RoastImportService reading from the given directory
    pub fn new(roasts_dir: impl Into<PathBuf>) -> Self {
        Self {
            roasts_dir: roasts_dir.into(),
        }
    }

    /// Load and parse every roast file, newest first.
    /// A missing directory is an empty list; unreadable files are skipped.
    pub async fn list_roasts(&self, limit: usize) -> AppResult<Vec<RoastTimeRoast>> {
        let mut roasts = self.load_all().await?;
        roasts.truncate(limit);
        Ok(roasts)
    }

    async fn load_all(&self) -> AppResult<Vec<RoastTimeRoast>> {
        let mut entries = match tokio::fs::read_dir(&self.roasts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::ImportError(e.to_string())),
        };

        let mut roasts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::ImportError(e.to_string()))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AppError::ImportError(e.to_string()))?;
            if !file_type.is_file() {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<RawRoast>(&bytes) {
                    Ok(raw) => roasts.push(parse_raw(raw)),
                    Err(e) => {
                        tracing::warn!("skipping unparseable roast file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("skipping unreadable roast file {:?}: {}", path, e);
                }
            }
        }

        roasts.sort_by(|a, b| b.roast_date.cmp(&a.roast_date));
        Ok(roasts)
    }

    /// Load one roast by its RoastTime uid (the file name)
    pub async fn get_roast(&self, uid: &str) -> AppResult<RoastTimeRoast> {
        if uid.is_empty() || uid.contains('/') || uid.contains('\\') || uid.contains("..") {
            return Err(AppError::validation("uid", "Invalid roast uid"));
        }

        let path = self.roasts_dir.join(uid);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| AppError::NotFound("RoastTime roast".to_string()))?;

        let raw = serde_json::from_slice::<RawRoast>(&bytes)
            .map_err(|e| AppError::ImportError(e.to_string()))?;

        Ok(parse_raw(raw))
    }

    /// Summary statistics over every roast on disk
    pub async fn summary(&self) -> AppResult<RoastTimeSummary> {
        let roasts = self.load_all().await?;

        if roasts.is_empty() {
            return Ok(RoastTimeSummary {
                count: 0,
                total_green_kg: 0.0,
                total_roasted_kg: 0.0,
                avg_weight_loss_percent: 0.0,
                earliest: None,
                latest: None,
            });
        }

        let total_green: f64 = roasts.iter().map(|r| r.green_weight_g).sum();
        let total_roasted: f64 = roasts.iter().map(|r| r.roasted_weight_g).sum();
        let avg_loss: f64 =
            roasts.iter().map(|r| r.weight_loss_percent).sum::<f64>() / roasts.len() as f64;
        let dates: Vec<DateTime<Utc>> = roasts.iter().filter_map(|r| r.roast_date).collect();

        Ok(RoastTimeSummary {
            count: roasts.len(),
            total_green_kg: (total_green / 10.0).round() / 100.0,
            total_roasted_kg: (total_roasted / 10.0).round() / 100.0,
            avg_weight_loss_percent: (avg_loss * 100.0).round() / 100.0,
            earliest: dates.iter().min().copied(),
            latest: dates.iter().max().copied(),
        })
    }
}
