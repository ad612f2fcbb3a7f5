use crate::common::models::Collection;
use crate::server::database::Database;
use chrono::Utc;
use log::{error, info, warn};
use std::{fs::OpenOptions, io::Write, time::Duration};
use sysinfo::System;
use tokio::time;

/// One sample of what the server is holding.
#[derive(Debug, Clone)]
pub struct StatsSample {
    pub counts: Vec<(Collection, i64)>,
    pub cpu_usage: f32,
}

impl StatsSample {
    pub fn csv_header() -> String {
        let names: Vec<&str> = Collection::ALL
            .iter()
            .filter(|c| !c.is_singleton())
            .map(|c| c.as_str())
            .collect();
        format!("# Timestamp, {}, CPU_Usage", names.join(", "))
    }

    pub fn csv_line(&self, timestamp: &str) -> String {
        let counts: Vec<String> = self.counts.iter().map(|(_, n)| n.to_string()).collect();
        format!("{}, {}, {:.1}%", timestamp, counts.join(", "), self.cpu_usage)
    }
}

pub async fn sample(db: &Database, system: &mut System) -> StatsSample {
    system.refresh_cpu();
    let cpus = system.cpus();
    let cpu_usage = if cpus.is_empty() {
        0.0
    } else {
        cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
    };

    let mut counts = Vec::new();
    for collection in Collection::ALL.into_iter().filter(|c| !c.is_singleton()) {
        let n = match db.count(collection).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count {}: {}", collection, e);
                -1
            }
        };
        counts.push((collection, n));
    }
    StatsSample { counts, cpu_usage }
}

pub async fn start_stats_logger(db: Database, log_path: &str, interval: Duration) {
    let mut system = System::new();

    let mut file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            error!("Unable to open stats log file '{}': {}", log_path, e);
            return;
        }
    };

    // Write header if file is empty
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        if let Err(e) = writeln!(file, "# Celebration Site Stats Log\n{}", StatsSample::csv_header()) {
            error!("Failed to write header to stats log: {}", e);
            return;
        }
        info!("📊 Stats log initialized: {}", log_path);
    }

    loop {
        let stats = sample(&db, &mut system).await;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

        let summary: Vec<String> = stats
            .counts
            .iter()
            .map(|(c, n)| format!("{}: {}", c, n))
            .collect();
        info!("📊 Records - {}, CPU: {:.1}%", summary.join(", "), stats.cpu_usage);

        if let Err(e) = writeln!(file, "{}", stats.csv_line(&timestamp)) {
            error!("Failed to write to stats log: {}", e);
        } else if let Err(e) = file.flush() {
            error!("Failed to flush stats log: {}", e);
        }

        time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_line_matches_header_columns() {
        let sample = StatsSample {
            counts: vec![(Collection::Events, 4), (Collection::Contacts, 3)],
            cpu_usage: 12.34,
        };
        assert_eq!(sample.csv_line("t"), "t, 4, 3, 12.3%");
        assert_eq!(
            StatsSample::csv_header(),
            "# Timestamp, events, contacts, reminders, notes, gallery, CPU_Usage"
        );
    }
}
