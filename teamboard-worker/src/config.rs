/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 2)
/// - `REMINDER_HOUR`: UTC hour of the daily run, 0-23 (default: 8)
/// - `REMINDER_WINDOW_HOURS`: how far ahead deadlines are considered (default: 24)

use std::env;

use crate::reminder::ReminderSettings;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub reminders: ReminderSettings,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()?;

        let reminders = ReminderSettings::new(
            parse_or("REMINDER_HOUR", 8)?,
            parse_or("REMINDER_WINDOW_HOURS", 24)?,
        )?;

        Ok(Self {
            database_url,
            max_connections,
            reminders,
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => Ok(value.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
