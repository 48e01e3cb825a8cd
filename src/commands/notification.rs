// Notification commands - due-date classification and the startup reminder

use chrono::{Local, NaiveDate};

use crate::models::Task;

/// Titles of open tasks bucketed by target date
#[derive(Debug, Default, PartialEq, serde::Serialize)]
pub struct DueTasks {
    pub dueToday: Vec<String>,
    pub overdue: Vec<String>,
}

/// Notification payload for the OS notification sink
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Classify open tasks against `today` (YYYY-MM-DD).
/// Zero-padded ISO dates compare correctly as strings.
pub fn checkDueTasks(tasks: &[Task], today: &str) -> DueTasks {
    let mut due = DueTasks::default();
    for task in tasks.iter().filter(|t| !t.isDone()) {
        let Some(target) = task.targetDate() else { continue };
        if target == today {
            due.dueToday.push(task.title().to_string());
        } else if target < today {
            due.overdue.push(task.title().to_string());
        }
    }
    due
}

pub fn todayIso(today: NaiveDate) -> String {
    today.format("%Y-%m-%d").to_string()
}

/// checkDueTasks against the local date
pub fn checkDueTasksToday(tasks: &[Task]) -> DueTasks {
    checkDueTasks(tasks, &todayIso(Local::now().date_naive()))
}

/// The one reminder shown after startup; overdue wins over due today
pub fn startupNotification(due: &DueTasks) -> Option<Notification> {
    if !due.overdue.is_empty() {
        Some(Notification {
            title: "Overdue Tasks".into(),
            message: format!("You have {} overdue task(s)!", due.overdue.len()),
        })
    } else if !due.dueToday.is_empty() {
        Some(Notification {
            title: "Tasks Due Today".into(),
            message: format!("You have {} task(s) due today.", due.dueToday.len()),
        })
    } else {
        None
    }
}
