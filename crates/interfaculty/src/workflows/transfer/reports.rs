use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, Faculty, Notification, Semester, Student, StudentId, TransferApplication,
    TransferStatus,
};
use super::machine::{ApplicationScope, ReviewStage, Reviewer};

/// Who is looking at the data, resolved from the caller's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Student(StudentId),
    Reviewer(Reviewer),
    Admin,
}

impl Viewer {
    /// Record-level visibility used by detail lookups, listings and export.
    pub fn sees(&self, entry: &ScopedApplication) -> bool {
        match self {
            Viewer::Student(student) => entry.application.student == *student,
            Viewer::Reviewer(reviewer) => reviewer.covers(&entry.scope),
            Viewer::Admin => true,
        }
    }
}

/// An application paired with its resolved faculty placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedApplication {
    pub application: TransferApplication,
    pub scope: ApplicationScope,
}

/// Fully resolved application used by API responses, dashboards and export rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub status: TransferStatus,
    pub status_label: &'static str,
    pub student_id: StudentId,
    pub student_name: String,
    pub admission_number: String,
    pub current_program: String,
    pub current_faculty: String,
    pub requested_program: String,
    pub requested_faculty: String,
    pub reason: String,
    pub academic_year: String,
    pub semester: Semester,
    pub semester_label: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hod_comment: Option<String>,
    pub dean_comment: Option<String>,
    pub registrar_comment: Option<String>,
    pub new_admission_number: Option<String>,
}

/// Counters shared by the summary and faculty reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub completed: usize,
}

impl CategoryCounts {
    /// Group statuses by their coarse category.
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TransferStatus>,
    {
        use super::domain::StatusCategory;

        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                counts.total += 1;
                match status.category() {
                    StatusCategory::Pending => counts.pending += 1,
                    StatusCategory::Approved => counts.approved += 1,
                    StatusCategory::Rejected => counts.rejected += 1,
                    StatusCategory::Completed => counts.completed += 1,
                }
                counts
            })
    }

    /// Count from one review stage's point of view: its inbox, its own approvals and
    /// rejections, and finished transfers.
    pub fn for_stage<I>(stage: ReviewStage, statuses: I) -> Self
    where
        I: IntoIterator<Item = TransferStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                counts.total += 1;
                if status == stage.awaiting() {
                    counts.pending += 1;
                }
                if status == stage.approved() {
                    counts.approved += 1;
                }
                if status == stage.rejected() {
                    counts.rejected += 1;
                }
                if status == TransferStatus::Completed {
                    counts.completed += 1;
                }
                counts
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub scope_label: String,
    #[serde(flatten)]
    pub counts: CategoryCounts,
}

/// Build the per-role summary over the applications the viewer can see.
pub fn status_summary(
    viewer: &Viewer,
    scope_label: impl Into<String>,
    entries: &[ScopedApplication],
) -> StatusSummary {
    let visible = entries
        .iter()
        .filter(|entry| viewer.sees(entry))
        .map(|entry| entry.application.status);

    let counts = match viewer {
        Viewer::Reviewer(reviewer) => CategoryCounts::for_stage(reviewer.stage, visible),
        Viewer::Student(_) | Viewer::Admin => CategoryCounts::tally(visible),
    };

    StatusSummary {
        scope_label: scope_label.into(),
        counts,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacultyReport {
    pub faculty: Option<Faculty>,
    pub counts: CategoryCounts,
    pub applications: Vec<ApplicationView>,
}

/// Applications leaving or entering `faculty`, or every application when `faculty` is `None`.
pub fn touches_faculty(entry: &ScopedApplication, faculty: Option<&Faculty>) -> bool {
    match faculty {
        Some(faculty) => {
            entry.scope.source_faculty == faculty.id || entry.scope.target_faculty == faculty.id
        }
        None => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student: Student,
    pub full_name: String,
    pub applications: Vec<ApplicationView>,
}

/// Role-specific landing data. Notifications listed here were unread until this view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Student {
        full_name: String,
        admission_number: String,
        has_completed_profile: bool,
        applications: Vec<ApplicationView>,
        notifications: Vec<Notification>,
    },
    Hod {
        scope_label: String,
        is_university_hod: bool,
        pending_count: usize,
        pending: Vec<ApplicationView>,
        applications: Vec<ApplicationView>,
        notifications: Vec<Notification>,
    },
    Dean {
        faculty: Faculty,
        pending_count: usize,
        pending: Vec<ApplicationView>,
        applications: Vec<ApplicationView>,
        notifications: Vec<Notification>,
    },
    Registrar {
        pending_count: usize,
        pending: Vec<ApplicationView>,
        completed: Vec<ApplicationView>,
        notifications: Vec<Notification>,
    },
}

/// Newest first, ties broken by id so the order is stable.
pub fn newest_first(entries: &mut [ScopedApplication]) {
    entries.sort_by(|a, b| {
        b.application
            .created_at
            .cmp(&a.application.created_at)
            .then(b.application.id.cmp(&a.application.id))
    });
}
