//! Execution report

use crate::runner::task::same_name;
use colored::Colorize;
use std::fmt;
use std::time::Duration;

/// Where in the run an entry was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Normal,
    Setup,
    Teardown,
}

/// Outcome of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The task's actions ran
    Executed,
    /// The task had no actions of its own
    Delegated,
    /// A criteria was not met
    Skipped,
    /// The task failed and the failure ended the run
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExecutionStatus::Executed => "Executed",
            ExecutionStatus::Delegated => "Delegated",
            ExecutionStatus::Skipped => "Skipped",
            ExecutionStatus::Failed => "Failed",
        };
        f.write_str(text)
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub task_name: String,
    pub duration: Duration,
    pub category: TaskCategory,
    pub status: ExecutionStatus,
    /// Criteria message for skipped tasks, error handler note for handled failures
    pub note: Option<String>,
}

/// Ordered record of what ran during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    entries: Vec<ReportEntry>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        task_name: impl Into<String>,
        category: TaskCategory,
        status: ExecutionStatus,
        duration: Duration,
        note: Option<String>,
    ) {
        self.entries.push(ReportEntry {
            task_name: task_name.into(),
            duration,
            category,
            status,
            note,
        });
    }

    pub fn add_executed(&mut self, task_name: impl Into<String>, duration: Duration) {
        self.add(task_name, TaskCategory::Normal, ExecutionStatus::Executed, duration, None);
    }

    pub fn add_skipped(&mut self, task_name: impl Into<String>, message: Option<String>) {
        self.add(
            task_name,
            TaskCategory::Normal,
            ExecutionStatus::Skipped,
            Duration::ZERO,
            message,
        );
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry for a task, ignoring case
    pub fn entry(&self, task_name: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|e| same_name(&e.task_name, task_name))
    }

    /// Names of the tasks with the given status, in run order
    pub fn tasks_with_status(&self, status: ExecutionStatus) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.category == TaskCategory::Normal && e.status == status)
            .map(|e| e.task_name.as_str())
            .collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.entries.iter().map(|e| e.duration).sum()
    }

    fn name_width(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.task_name.len())
            .chain(std::iter::once("Total:".len()))
            .max()
            .unwrap_or(0)
            + 2
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.name_width();
        writeln!(f, "{:<width$}{:<20}{}", "Task", "Duration", "Status", width = width)?;
        writeln!(f, "{}", "-".repeat(width + 30))?;
        for entry in &self.entries {
            write!(
                f,
                "{:<width$}{:<20}{}",
                entry.task_name,
                format_duration(entry.duration),
                entry.status,
                width = width
            )?;
            if let Some(note) = &entry.note {
                write!(f, " ({})", note)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", "-".repeat(width + 30))?;
        write!(
            f,
            "{:<width$}{}",
            "Total:",
            format_duration(self.total_duration()),
            width = width
        )
    }
}

/// Format a duration as `hh:mm:ss.fffffff`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:07}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_nanos() / 100
    )
}

/// Consumer of a finished report
pub trait ReportPrinter {
    fn write(&self, report: &ExecutionReport);
}

/// Prints the report to stdout with colored statuses
#[derive(Debug, Default)]
pub struct ConsoleReportPrinter;

impl ReportPrinter for ConsoleReportPrinter {
    fn write(&self, report: &ExecutionReport) {
        if report.is_empty() {
            return;
        }

        let width = report.name_width();
        println!();
        println!("{:<width$}{:<20}{}", "Task", "Duration", "Status", width = width);
        println!("{}", "-".repeat(width + 30));
        for entry in report.entries() {
            let status = match entry.status {
                ExecutionStatus::Executed => entry.status.to_string().green(),
                ExecutionStatus::Delegated => entry.status.to_string().cyan(),
                ExecutionStatus::Skipped => entry.status.to_string().yellow(),
                ExecutionStatus::Failed => entry.status.to_string().red(),
            };
            let line = format!(
                "{:<width$}{:<20}{}",
                entry.task_name,
                format_duration(entry.duration),
                status,
                width = width
            );
            match &entry.note {
                Some(note) => println!("{} {}", line, format!("({})", note).dimmed()),
                None => println!("{}", line),
            }
        }
        println!("{}", "-".repeat(width + 30));
        println!(
            "{}",
            format!(
                "{:<width$}{}",
                "Total:",
                format_duration(report.total_duration()),
                width = width
            )
            .bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00.0000000");
        assert_eq!(
            format_duration(Duration::from_millis(3_723_500)),
            "01:02:03.5000000"
        );
    }

    #[test]
    fn test_report_records_in_order() {
        let mut report = ExecutionReport::new();
        report.add("Setup", TaskCategory::Setup, ExecutionStatus::Executed, Duration::ZERO, None);
        report.add_executed("build", Duration::from_millis(10));
        report.add_skipped("deploy", Some("not on main".to_string()));

        let names: Vec<&str> = report.entries().iter().map(|e| e.task_name.as_str()).collect();
        assert_eq!(names, vec!["Setup", "build", "deploy"]);
        assert_eq!(report.tasks_with_status(ExecutionStatus::Executed), vec!["build"]);
        assert_eq!(report.entry("DEPLOY").unwrap().status, ExecutionStatus::Skipped);
        assert_eq!(report.total_duration(), Duration::from_millis(10));
    }

    #[test]
    fn test_display_includes_notes_and_total() {
        let mut report = ExecutionReport::new();
        report.add_executed("build", Duration::from_secs(1));
        report.add_skipped("deploy", Some("not on main".to_string()));

        let text = report.to_string();
        assert!(text.contains("build"));
        assert!(text.contains("Skipped (not on main)"));
        assert!(text.contains("Total:"));
        assert!(text.contains("00:00:01.0000000"));
    }
}
