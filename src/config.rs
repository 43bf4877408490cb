// Kiosk configuration - environment-driven, keeping the variable names the
// deployments already use.

use std::env;
use std::path::PathBuf;

/// Default application configuration.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    /// Directory for mutable data (database lives here by default).
    pub data_dir: PathBuf,
    pub database_path: PathBuf,

    /// Roster CSV and its column mapping. An empty card column list gives
    /// a name-only directory.
    pub roster_csv_path: PathBuf,
    pub name_column: String,
    pub card_columns: Vec<String>,

    /// Configured areas, in report order.
    pub areas: Vec<String>,

    pub log_level: String,
}

impl KioskConfig {
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env_or("DATA_DIR", "/config"));
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("checkins.sqlite"));

        KioskConfig {
            database_path,
            roster_csv_path: PathBuf::from(env_or("STUDENT_CSV_PATH", "students.csv")),
            name_column: env_or("DIRECTORY_NAME_COLUMN", "Full Name"),
            card_columns: split_list(&env_or(
                "DIRECTORY_CARD_COLUMNS",
                "Primary Card Number,Secondary Card Number",
            )),
            areas: parse_area_list(env::var("CHECKIN_AREAS").ok().as_deref()),
            log_level: env_or("LOG_LEVEL", "info"),
            data_dir,
        }
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            data_dir: PathBuf::from("/config"),
            database_path: PathBuf::from("/config/checkins.sqlite"),
            roster_csv_path: PathBuf::from("students.csv"),
            name_column: "Full Name".to_string(),
            card_columns: vec![
                "Primary Card Number".to_string(),
                "Secondary Card Number".to_string(),
            ],
            areas: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits the configured area list on `;` or `,`, dropping empty items.
pub fn parse_area_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(raw) => raw
            .replace(',', ";")
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
