use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    ApplicationId, Faculty, FacultyId, Notification, NotificationId, Profile, Program, ProgramId,
    Role, Student, StudentId, StudentRegistration, TransferApplication, TransferStatus,
    TransferSubmission, UserAccount, UserId,
};
use super::export::{render_csv, CsvExport, ExportError};
use super::machine::{
    transition, ApplicationScope, FacultyScope, NotificationTemplate, PlannedNotification,
    Recipient, ReviewAction, ReviewStage, Reviewer, WorkflowError,
};
use super::messages::MessageContext;
use super::reports::{
    self, newest_first, touches_faculty, ApplicationView, CategoryCounts, Dashboard,
    FacultyReport, ScopedApplication, StatusSummary, StudentRecord, Viewer,
};
use super::repository::{
    ApplicationRepository, Directory, NotificationError, NotificationPublisher, RepositoryError,
};

/// Service driving submissions, reviews, dashboards and reports over the injected stores.
pub struct TransferService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    notifications: Arc<N>,
}

/// Program and faculty lookups loaded once per call.
struct Catalog {
    programs: HashMap<ProgramId, Program>,
    faculties: HashMap<FacultyId, Faculty>,
}

impl Catalog {
    fn program(&self, id: ProgramId) -> Result<&Program, TransferServiceError> {
        self.programs
            .get(&id)
            .ok_or_else(|| TransferServiceError::not_found("program", id))
    }

    fn faculty(&self, id: FacultyId) -> Result<&Faculty, TransferServiceError> {
        self.faculties
            .get(&id)
            .ok_or_else(|| TransferServiceError::not_found("faculty", id))
    }

    fn scope(
        &self,
        application: &TransferApplication,
    ) -> Result<ApplicationScope, TransferServiceError> {
        Ok(ApplicationScope {
            source_faculty: self.program(application.current_program)?.faculty,
            target_faculty: self.program(application.requested_program)?.faculty,
            requested_program: application.requested_program,
        })
    }

    fn scope_label(&self, scope: FacultyScope) -> Result<String, TransferServiceError> {
        match scope {
            FacultyScope::University => Ok("All Faculties".to_string()),
            FacultyScope::Faculty(id) => Ok(self.faculty(id)?.name.clone()),
        }
    }
}

impl<R, D, N> TransferService<R, D, N>
where
    R: ApplicationRepository + 'static,
    D: Directory + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            directory,
            notifications,
        }
    }

    /// Role of the caller, if they have a profile. Used to pick a fallback view on errors.
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        self.directory
            .profile(user)
            .ok()
            .flatten()
            .map(|profile| profile.role)
    }

    /// Create the account, student record and student profile for a self-registration.
    pub fn register_student(
        &self,
        form: StudentRegistration,
    ) -> Result<Student, TransferServiceError> {
        let username = form.username.trim().to_string();
        let admission_number = form.admission_number.trim().to_string();

        if username.is_empty() {
            return Err(invalid("username is required"));
        }
        if admission_number.is_empty() {
            return Err(invalid("admission number is required"));
        }
        if form.password.is_empty() {
            return Err(invalid("password is required"));
        }
        if form.password != form.confirm_password {
            return Err(invalid("passwords do not match"));
        }
        if !(1..=6).contains(&form.current_year) {
            return Err(invalid("current year must be between 1 and 6"));
        }

        let program = self
            .directory
            .program(form.current_program)?
            .ok_or_else(|| TransferServiceError::not_found("program", form.current_program))?;

        if self.directory.account_by_username(&username)?.is_some() {
            return Err(invalid(format!("username {username} is already taken")));
        }
        if self
            .directory
            .student_by_admission(&admission_number)?
            .is_some()
        {
            return Err(invalid(format!(
                "admission number {admission_number} is already registered"
            )));
        }

        let phone = form.phone.trim().to_string();
        let account = UserAccount {
            id: UserId(0),
            username,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
        };
        let student = Student {
            id: StudentId(0),
            user_id: UserId(0),
            admission_number,
            current_program: program.id,
            current_year: form.current_year,
            phone: phone.clone(),
            address: None,
            kcse: Default::default(),
        };
        let profile = Profile {
            user_id: UserId(0),
            role: Role::Student,
            faculty: Some(program.faculty),
            phone: (!phone.is_empty()).then_some(phone),
            department: None,
        };
        let student = self.directory.enrol_student(account, student, profile)?;

        info!(
            user_id = %student.user_id,
            student_id = %student.id,
            program = %program.name,
            "registered student"
        );
        Ok(student)
    }

    /// Programs the caller may request: everything outside their current faculty.
    pub fn eligible_programs(&self, user: UserId) -> Result<Vec<Program>, TransferServiceError> {
        let student = self.calling_student(user)?;
        let catalog = self.catalog()?;
        let current_faculty = catalog.program(student.current_program)?.faculty;

        let mut programs: Vec<Program> = catalog
            .programs
            .into_values()
            .filter(|program| program.faculty != current_faculty)
            .collect();
        programs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(programs)
    }

    /// Open a new application at `pending_hod` and alert the first-stage reviewer.
    pub fn submit(
        &self,
        user: UserId,
        submission: TransferSubmission,
    ) -> Result<ApplicationView, TransferServiceError> {
        let mut student = self.calling_student(user)?;

        let open = self
            .repository
            .for_student(student.id)?
            .into_iter()
            .find(|application| application.status.is_open());
        if let Some(open) = open {
            return Err(invalid(format!(
                "you already have a pending transfer application (#{})",
                open.id
            )));
        }

        let catalog = self.catalog()?;
        let current = catalog.program(student.current_program)?;
        let requested = catalog.program(submission.requested_program)?;
        if requested.faculty == current.faculty {
            return Err(invalid(
                "the requested program must belong to a different faculty",
            ));
        }

        let reason = submission.reason.trim();
        let academic_year = submission.academic_year.trim();
        if reason.is_empty() {
            return Err(invalid("a reason for the transfer is required"));
        }
        if academic_year.is_empty() {
            return Err(invalid("academic year is required"));
        }

        if submission.kcse.is_some() || submission.address.is_some() {
            if let Some(kcse) = submission.kcse {
                student.kcse = kcse;
            }
            if let Some(address) = submission.address {
                student.address = Some(address);
            }
            self.directory.update_student(student.clone())?;
        }

        let now = Utc::now();
        let application = self.repository.insert(TransferApplication {
            id: ApplicationId(0),
            student: student.id,
            current_program: current.id,
            requested_program: requested.id,
            reason: reason.to_string(),
            academic_year: academic_year.to_string(),
            semester: submission.semester,
            status: TransferStatus::PendingHod,
            created_at: now,
            updated_at: now,
            hod_comment: None,
            dean_comment: None,
            registrar_comment: None,
            new_admission_number: None,
        })?;

        info!(
            application_id = %application.id,
            student_id = %student.id,
            from = %current.name,
            to = %requested.name,
            "transfer application submitted"
        );

        let recipient = if self.directory.find_profile(Role::Hod, None)?.is_some() {
            Recipient::UniversityHod
        } else {
            Recipient::Hod(current.faculty)
        };
        let plan = [PlannedNotification::new(
            recipient,
            NotificationTemplate::ApplicationSubmitted,
        )];
        self.dispatch(&catalog, &application, &student, &plan)?;

        self.view(&catalog, &application)
    }

    /// Record a decision at whichever stage the caller's role reviews.
    pub fn review(
        &self,
        user: UserId,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        let reviewer = self.reviewer(user)?;
        self.apply_review(reviewer, application_id, action)
    }

    pub fn hod_review(
        &self,
        user: UserId,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        self.review_at(ReviewStage::Hod, user, application_id, action)
    }

    pub fn dean_review(
        &self,
        user: UserId,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        self.review_at(ReviewStage::Dean, user, application_id, action)
    }

    pub fn registrar_review(
        &self,
        user: UserId,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        self.review_at(ReviewStage::Registrar, user, application_id, action)
    }

    /// Single application, subject to the caller's visibility.
    pub fn get(
        &self,
        user: UserId,
        application_id: ApplicationId,
    ) -> Result<ApplicationView, TransferServiceError> {
        let viewer = self.viewer(user)?;
        let application = self.application(application_id)?;
        let catalog = self.catalog()?;
        let entry = ScopedApplication {
            scope: catalog.scope(&application)?,
            application,
        };

        if !viewer.sees(&entry) {
            return Err(not_authorized("you cannot view this application"));
        }
        self.view(&catalog, &entry.application)
    }

    /// Applications waiting on the caller's stage, newest first.
    pub fn pending_queue(
        &self,
        user: UserId,
    ) -> Result<Vec<ApplicationView>, TransferServiceError> {
        let reviewer = self.reviewer(user)?;
        let catalog = self.catalog()?;
        let pending: Vec<_> = self
            .entries(&catalog)?
            .into_iter()
            .filter(|entry| reviewer.queues(entry.application.status, &entry.scope))
            .collect();
        self.views(&catalog, &pending)
    }

    /// Role landing data. Unread notifications are returned once and then marked read.
    pub fn dashboard(&self, user: UserId) -> Result<Dashboard, TransferServiceError> {
        let viewer = self.viewer(user)?;
        let catalog = self.catalog()?;
        let visible: Vec<_> = self
            .entries(&catalog)?
            .into_iter()
            .filter(|entry| viewer.sees(entry))
            .collect();

        let dashboard = match viewer {
            Viewer::Student(student_id) => {
                let student = self.student(student_id)?;
                let account = self.account(student.user_id)?;
                Dashboard::Student {
                    full_name: account.full_name(),
                    admission_number: student.admission_number.clone(),
                    has_completed_profile: student.has_completed_profile(),
                    applications: self.views(&catalog, &visible)?,
                    notifications: self.take_unread(user)?,
                }
            }
            Viewer::Reviewer(reviewer) => {
                let pending: Vec<_> = visible
                    .iter()
                    .filter(|entry| reviewer.queues(entry.application.status, &entry.scope))
                    .cloned()
                    .collect();
                let pending_count = pending.len();
                let pending = self.views(&catalog, &pending)?;

                match reviewer.stage {
                    ReviewStage::Hod => Dashboard::Hod {
                        scope_label: catalog.scope_label(reviewer.scope)?,
                        is_university_hod: reviewer.is_university_wide(),
                        pending_count,
                        pending,
                        applications: self.views(&catalog, &visible)?,
                        notifications: self.take_unread(user)?,
                    },
                    ReviewStage::Dean => {
                        // Reviewer::from_profile refuses deans without a faculty.
                        let FacultyScope::Faculty(faculty) = reviewer.scope else {
                            return Err(not_authorized("dean profile has no faculty assigned"));
                        };
                        Dashboard::Dean {
                            faculty: catalog.faculty(faculty)?.clone(),
                            pending_count,
                            pending,
                            applications: self.views(&catalog, &visible)?,
                            notifications: self.take_unread(user)?,
                        }
                    }
                    ReviewStage::Registrar => {
                        let mut completed: Vec<_> = visible
                            .into_iter()
                            .filter(|entry| entry.application.status == TransferStatus::Completed)
                            .collect();
                        completed.sort_by(|a, b| {
                            b.application
                                .updated_at
                                .cmp(&a.application.updated_at)
                                .then(b.application.id.cmp(&a.application.id))
                        });
                        Dashboard::Registrar {
                            pending_count,
                            pending,
                            completed: self.views(&catalog, &completed)?,
                            notifications: self.take_unread(user)?,
                        }
                    }
                }
            }
            Viewer::Admin => return Err(not_authorized("admin accounts use the admin console")),
        };

        Ok(dashboard)
    }

    pub fn status_summary(&self, user: UserId) -> Result<StatusSummary, TransferServiceError> {
        let viewer = self.viewer(user)?;
        let catalog = self.catalog()?;

        let scope_label = match viewer {
            Viewer::Student(student_id) => {
                let student = self.student(student_id)?;
                self.account(student.user_id)?.full_name()
            }
            Viewer::Reviewer(reviewer) => catalog.scope_label(reviewer.scope)?,
            Viewer::Admin => {
                return Err(not_authorized(
                    "status summaries are available to students and reviewers",
                ))
            }
        };

        let entries = self.entries(&catalog)?;
        Ok(reports::status_summary(&viewer, scope_label, &entries))
    }

    /// Applications entering or leaving a faculty, or all of them when `faculty_code` is absent.
    pub fn faculty_report(
        &self,
        user: UserId,
        faculty_code: Option<&str>,
    ) -> Result<FacultyReport, TransferServiceError> {
        let profile = self.profile(user)?;
        if !matches!(profile.role, Role::Hod | Role::Registrar | Role::Admin) {
            return Err(not_authorized(
                "faculty reports are available to HODs, the registrar and admins",
            ));
        }

        let faculty = match faculty_code {
            Some(code) => Some(
                self.directory
                    .faculty_by_code(code)?
                    .ok_or_else(|| TransferServiceError::not_found("faculty", code))?,
            ),
            None => None,
        };

        let catalog = self.catalog()?;
        let matching: Vec<_> = self
            .entries(&catalog)?
            .into_iter()
            .filter(|entry| touches_faculty(entry, faculty.as_ref()))
            .collect();

        Ok(FacultyReport {
            counts: CategoryCounts::tally(matching.iter().map(|entry| entry.application.status)),
            applications: self.views(&catalog, &matching)?,
            faculty,
        })
    }

    pub fn student_record(
        &self,
        user: UserId,
        student_id: StudentId,
    ) -> Result<StudentRecord, TransferServiceError> {
        let profile = self.profile(user)?;
        if profile.role == Role::Student {
            return Err(not_authorized("student records are available to staff only"));
        }

        let student = self.student(student_id)?;
        let account = self.account(student.user_id)?;
        let catalog = self.catalog()?;
        let mut entries = self
            .repository
            .for_student(student.id)?
            .into_iter()
            .map(|application| {
                Ok(ScopedApplication {
                    scope: catalog.scope(&application)?,
                    application,
                })
            })
            .collect::<Result<Vec<_>, TransferServiceError>>()?;
        newest_first(&mut entries);

        Ok(StudentRecord {
            full_name: account.full_name(),
            applications: self.views(&catalog, &entries)?,
            student,
        })
    }

    /// CSV of every application the caller can see.
    pub fn export_csv(&self, user: UserId) -> Result<CsvExport, TransferServiceError> {
        let viewer = self.viewer(user)?;
        let catalog = self.catalog()?;
        let visible: Vec<_> = self
            .entries(&catalog)?
            .into_iter()
            .filter(|entry| viewer.sees(entry))
            .collect();

        let rows = self.views(&catalog, &visible)?;
        let export = render_csv(&rows, Utc::now())?;
        info!(user_id = %user, rows = rows.len(), "exported transfer applications");
        Ok(export)
    }

    fn review_at(
        &self,
        stage: ReviewStage,
        user: UserId,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        let reviewer = self.reviewer(user)?;
        if reviewer.stage != stage {
            return Err(not_authorized(format!(
                "only the {stage} can record this decision"
            )));
        }
        self.apply_review(reviewer, application_id, action)
    }

    fn apply_review(
        &self,
        reviewer: Reviewer,
        application_id: ApplicationId,
        action: ReviewAction,
    ) -> Result<ApplicationView, TransferServiceError> {
        let application = self.application(application_id)?;
        let catalog = self.catalog()?;
        let scope = catalog.scope(&application)?;
        let step = transition(application.status, &action, &reviewer, &scope)?;

        let mut student = self.student(application.student)?;
        if let Some(reassignment) = &step.reassignment {
            let holder = self
                .directory
                .student_by_admission(&reassignment.admission_number)?;
            if holder.is_some_and(|holder| holder.id != student.id) {
                return Err(invalid(format!(
                    "admission number {} is already assigned to another student",
                    reassignment.admission_number
                )));
            }
        }

        let mut updated = application.clone();
        step.apply(&mut updated, Utc::now());
        self.repository
            .compare_and_swap(step.from, updated.clone())
            .map_err(|err| match err {
                RepositoryError::StatusChanged { expected, actual } => {
                    TransferServiceError::Workflow(WorkflowError::InvalidState {
                        stage: step.stage,
                        expected,
                        actual,
                    })
                }
                other => other.into(),
            })?;

        if let Some(reassignment) = &step.reassignment {
            let previous_admission = student.admission_number.clone();
            student.current_program = reassignment.program;
            student.admission_number = reassignment.admission_number.clone();
            if let Err(err) = self.directory.update_student(student.clone()) {
                self.revert(step.to, application, &err);
                return Err(match err {
                    RepositoryError::Conflict(_) => invalid(format!(
                        "admission number {} is already assigned to another student",
                        reassignment.admission_number
                    )),
                    other => other.into(),
                });
            }
            info!(
                student_id = %student.id,
                previous_admission = %previous_admission,
                admission_number = %student.admission_number,
                "student reassigned to new program"
            );
        }

        info!(
            application_id = %updated.id,
            reviewer = %reviewer.user_id,
            stage = %step.stage,
            from = %step.from,
            to = %step.to,
            "transfer application reviewed"
        );

        self.dispatch(&catalog, &updated, &student, &step.notifications)?;
        self.view(&catalog, &updated)
    }

    /// Put `original` back after a follow-up write failed, so the stage can be retried.
    fn revert(
        &self,
        applied: TransferStatus,
        original: TransferApplication,
        cause: &RepositoryError,
    ) {
        let application_id = original.id;
        let status = original.status;
        match self.repository.compare_and_swap(applied, original) {
            Ok(()) => warn!(
                application_id = %application_id,
                status = %status,
                error = %cause,
                "student update failed; review reverted"
            ),
            Err(err) => error!(
                application_id = %application_id,
                error = %cause,
                revert_error = %err,
                "student update failed and the review could not be reverted"
            ),
        }
    }

    /// Deliver planned notifications. Delivery failures are logged and skipped.
    fn dispatch(
        &self,
        catalog: &Catalog,
        application: &TransferApplication,
        student: &Student,
        plan: &[PlannedNotification],
    ) -> Result<(), TransferServiceError> {
        let student_name = self.account(student.user_id)?.full_name();
        let current = catalog.program(application.current_program)?;
        let requested = catalog.program(application.requested_program)?;
        let requested_faculty = catalog.faculty(requested.faculty)?;
        let ctx = MessageContext {
            student_name: &student_name,
            current_program: &current.name,
            requested_program: &requested.name,
            requested_faculty: &requested_faculty.name,
        };

        for planned in plan {
            let recipient = match self.resolve(planned.recipient, student) {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(
                        application_id = %application.id,
                        recipient = ?planned.recipient,
                        "no account holds this role; notification skipped"
                    );
                    continue;
                }
                Err(err) => {
                    warn!(
                        application_id = %application.id,
                        recipient = ?planned.recipient,
                        error = %err,
                        "recipient lookup failed; notification skipped"
                    );
                    continue;
                }
            };

            let notification = Notification {
                id: NotificationId(0),
                recipient,
                message: planned.template.render(&ctx),
                application: Some(application.id),
                is_read: false,
                created_at: Utc::now(),
            };
            if let Err(err) = self.notifications.publish(notification) {
                warn!(
                    application_id = %application.id,
                    recipient = %recipient,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }

        Ok(())
    }

    fn resolve(
        &self,
        recipient: Recipient,
        student: &Student,
    ) -> Result<Option<UserId>, RepositoryError> {
        let profile = match recipient {
            Recipient::Student => return Ok(Some(student.user_id)),
            Recipient::UniversityHod => self.directory.find_profile(Role::Hod, None)?,
            Recipient::Hod(faculty) => self.directory.find_profile(Role::Hod, Some(faculty))?,
            Recipient::Dean(faculty) => self.directory.find_profile(Role::Dean, Some(faculty))?,
            Recipient::Registrar => self.directory.registrar()?,
        };
        Ok(profile.map(|profile| profile.user_id))
    }

    /// Unread notifications newest first, marked read on the way out.
    fn take_unread(&self, user: UserId) -> Result<Vec<Notification>, TransferServiceError> {
        let mut unread = self.notifications.unread(user)?;
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let ids: Vec<_> = unread.iter().map(|notification| notification.id).collect();
        if !ids.is_empty() {
            self.notifications.mark_read(&ids)?;
        }
        Ok(unread)
    }

    fn catalog(&self) -> Result<Catalog, TransferServiceError> {
        Ok(Catalog {
            programs: self
                .directory
                .programs()?
                .into_iter()
                .map(|program| (program.id, program))
                .collect(),
            faculties: self
                .directory
                .faculties()?
                .into_iter()
                .map(|faculty| (faculty.id, faculty))
                .collect(),
        })
    }

    /// Every application with its faculty placement, newest first.
    fn entries(&self, catalog: &Catalog) -> Result<Vec<ScopedApplication>, TransferServiceError> {
        let mut entries = self
            .repository
            .list()?
            .into_iter()
            .map(|application| {
                Ok(ScopedApplication {
                    scope: catalog.scope(&application)?,
                    application,
                })
            })
            .collect::<Result<Vec<_>, TransferServiceError>>()?;
        newest_first(&mut entries);
        Ok(entries)
    }

    fn views(
        &self,
        catalog: &Catalog,
        entries: &[ScopedApplication],
    ) -> Result<Vec<ApplicationView>, TransferServiceError> {
        entries
            .iter()
            .map(|entry| self.view(catalog, &entry.application))
            .collect()
    }

    fn view(
        &self,
        catalog: &Catalog,
        application: &TransferApplication,
    ) -> Result<ApplicationView, TransferServiceError> {
        let student = self.student(application.student)?;
        let account = self.account(student.user_id)?;
        let current = catalog.program(application.current_program)?;
        let requested = catalog.program(application.requested_program)?;

        Ok(ApplicationView {
            id: application.id,
            status: application.status,
            status_label: application.status.label(),
            student_id: student.id,
            student_name: account.full_name(),
            admission_number: student.admission_number,
            current_program: current.name.clone(),
            current_faculty: catalog.faculty(current.faculty)?.name.clone(),
            requested_program: requested.name.clone(),
            requested_faculty: catalog.faculty(requested.faculty)?.name.clone(),
            reason: application.reason.clone(),
            academic_year: application.academic_year.clone(),
            semester: application.semester,
            semester_label: application.semester.label(),
            created_at: application.created_at,
            updated_at: application.updated_at,
            hod_comment: application.hod_comment.clone(),
            dean_comment: application.dean_comment.clone(),
            registrar_comment: application.registrar_comment.clone(),
            new_admission_number: application.new_admission_number.clone(),
        })
    }

    fn profile(&self, user: UserId) -> Result<Profile, TransferServiceError> {
        self.directory
            .profile(user)?
            .ok_or_else(|| TransferServiceError::not_found("profile", user))
    }

    fn viewer(&self, user: UserId) -> Result<Viewer, TransferServiceError> {
        let profile = self.profile(user)?;
        match profile.role {
            Role::Student => Ok(Viewer::Student(self.student_for_user(user)?.id)),
            Role::Admin => Ok(Viewer::Admin),
            Role::Hod | Role::Dean | Role::Registrar => {
                Ok(Viewer::Reviewer(Reviewer::from_profile(&profile)?))
            }
        }
    }

    fn reviewer(&self, user: UserId) -> Result<Reviewer, TransferServiceError> {
        Ok(Reviewer::from_profile(&self.profile(user)?)?)
    }

    fn calling_student(&self, user: UserId) -> Result<Student, TransferServiceError> {
        let profile = self.profile(user)?;
        if profile.role != Role::Student {
            return Err(not_authorized("only students can apply for transfers"));
        }
        self.student_for_user(user)
    }

    fn student_for_user(&self, user: UserId) -> Result<Student, TransferServiceError> {
        self.directory
            .student_for_user(user)?
            .ok_or_else(|| TransferServiceError::not_found("student profile for user", user))
    }

    fn student(&self, id: StudentId) -> Result<Student, TransferServiceError> {
        self.directory
            .student(id)?
            .ok_or_else(|| TransferServiceError::not_found("student", id))
    }

    fn account(&self, id: UserId) -> Result<UserAccount, TransferServiceError> {
        self.directory
            .account(id)?
            .ok_or_else(|| TransferServiceError::not_found("user", id))
    }

    fn application(&self, id: ApplicationId) -> Result<TransferApplication, TransferServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| TransferServiceError::not_found("application", id))
    }
}

fn not_authorized(message: impl Into<String>) -> TransferServiceError {
    TransferServiceError::Workflow(WorkflowError::NotAuthorized(message.into()))
}

fn invalid(message: impl Into<String>) -> TransferServiceError {
    TransferServiceError::Workflow(WorkflowError::Validation(message.into()))
}

/// Error raised by the transfer service.
#[derive(Debug, thiserror::Error)]
pub enum TransferServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Coarse classification used when mapping service errors onto HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthorized,
    NotFound,
    InvalidState,
    Validation,
    Unavailable,
}

impl ErrorKind {
    /// HTTP status reported for this kind of failure.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotAuthorized => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl TransferServiceError {
    fn not_found(entity: &'static str, key: impl ToString) -> Self {
        TransferServiceError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferServiceError::Workflow(WorkflowError::NotAuthorized(_)) => {
                ErrorKind::NotAuthorized
            }
            TransferServiceError::Workflow(WorkflowError::InvalidState { .. }) => {
                ErrorKind::InvalidState
            }
            TransferServiceError::Workflow(WorkflowError::Validation(_)) => ErrorKind::Validation,
            TransferServiceError::NotFound { .. }
            | TransferServiceError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            TransferServiceError::Repository(RepositoryError::Conflict(_))
            | TransferServiceError::Repository(RepositoryError::StatusChanged { .. }) => {
                ErrorKind::InvalidState
            }
            TransferServiceError::Repository(RepositoryError::Unavailable(_))
            | TransferServiceError::Notification(_)
            | TransferServiceError::Export(_) => ErrorKind::Unavailable,
        }
    }
}
