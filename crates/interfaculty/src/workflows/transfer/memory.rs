//! Mutex-guarded in-memory stores used by the API binary, the demo and the tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    ApplicationId, Faculty, FacultyId, Notification, NotificationId, Profile, Program, ProgramId,
    Student, StudentId, TransferApplication, TransferStatus, UserAccount, UserId,
};
use super::repository::{
    ApplicationRepository, Directory, NotificationError, NotificationPublisher, RepositoryError,
};

#[derive(Default)]
struct ApplicationTable {
    next_id: u64,
    records: BTreeMap<ApplicationId, TransferApplication>,
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    table: Arc<Mutex<ApplicationTable>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(
        &self,
        mut application: TransferApplication,
    ) -> Result<TransferApplication, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        guard.next_id += 1;
        application.id = ApplicationId(guard.next_id);
        guard.records.insert(application.id, application.clone());
        Ok(application)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<TransferApplication>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.records.get(&id).cloned())
    }

    fn compare_and_swap(
        &self,
        expected: TransferStatus,
        application: TransferApplication,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        let stored = guard
            .records
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.status != expected {
            return Err(RepositoryError::StatusChanged {
                expected,
                actual: stored.status,
            });
        }

        *stored = application;
        Ok(())
    }

    fn list(&self) -> Result<Vec<TransferApplication>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.records.values().cloned().collect())
    }
}

#[derive(Default)]
struct DirectoryTables {
    next_faculty: u64,
    next_program: u64,
    next_user: u64,
    next_student: u64,
    faculties: BTreeMap<FacultyId, Faculty>,
    programs: BTreeMap<ProgramId, Program>,
    accounts: BTreeMap<UserId, UserAccount>,
    profiles: BTreeMap<UserId, Profile>,
    students: BTreeMap<StudentId, Student>,
}

#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    tables: Arc<Mutex<DirectoryTables>>,
}

impl InMemoryDirectory {
    /// Register a faculty. Names are unique.
    pub fn add_faculty(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Faculty, RepositoryError> {
        let name = name.into();
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if guard.faculties.values().any(|faculty| faculty.name == name) {
            return Err(RepositoryError::Conflict(format!("faculty {name}")));
        }

        guard.next_faculty += 1;
        let faculty = Faculty {
            id: FacultyId(guard.next_faculty),
            code: code.into(),
            name,
        };
        guard.faculties.insert(faculty.id, faculty.clone());
        Ok(faculty)
    }

    pub fn add_program(
        &self,
        name: impl Into<String>,
        faculty: FacultyId,
    ) -> Result<Program, RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if !guard.faculties.contains_key(&faculty) {
            return Err(RepositoryError::NotFound);
        }

        guard.next_program += 1;
        let program = Program {
            id: ProgramId(guard.next_program),
            name: name.into(),
            faculty,
        };
        guard.programs.insert(program.id, program.clone());
        Ok(program)
    }
}

impl Directory for InMemoryDirectory {
    fn faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.faculties.get(&id).cloned())
    }

    fn faculty_by_code(&self, code: &str) -> Result<Option<Faculty>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard
            .faculties
            .values()
            .find(|faculty| faculty.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    fn faculties(&self) -> Result<Vec<Faculty>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.faculties.values().cloned().collect())
    }

    fn program(&self, id: ProgramId) -> Result<Option<Program>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.programs.get(&id).cloned())
    }

    fn programs(&self) -> Result<Vec<Program>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.programs.values().cloned().collect())
    }

    fn account(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.accounts.get(&id).cloned())
    }

    fn account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    fn insert_account(&self, mut account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if guard
            .accounts
            .values()
            .any(|existing| existing.username == account.username)
        {
            return Err(RepositoryError::Conflict(format!(
                "username {}",
                account.username
            )));
        }

        guard.next_user += 1;
        account.id = UserId(guard.next_user);
        guard.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn profile(&self, user: UserId) -> Result<Option<Profile>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.profiles.get(&user).cloned())
    }

    fn profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.profiles.values().cloned().collect())
    }

    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if !guard.accounts.contains_key(&profile.user_id) {
            return Err(RepositoryError::NotFound);
        }
        if guard.profiles.contains_key(&profile.user_id) {
            return Err(RepositoryError::Conflict(format!(
                "profile for user {}",
                profile.user_id
            )));
        }

        guard.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard.students.get(&id).cloned())
    }

    fn student_for_user(&self, user: UserId) -> Result<Option<Student>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard
            .students
            .values()
            .find(|student| student.user_id == user)
            .cloned())
    }

    fn student_by_admission(
        &self,
        admission_number: &str,
    ) -> Result<Option<Student>, RepositoryError> {
        let guard = self.tables.lock().expect("directory mutex poisoned");
        Ok(guard
            .students
            .values()
            .find(|student| student.admission_number == admission_number)
            .cloned())
    }

    fn insert_student(&self, mut student: Student) -> Result<Student, RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if guard
            .students
            .values()
            .any(|existing| existing.admission_number == student.admission_number)
        {
            return Err(RepositoryError::Conflict(format!(
                "admission number {}",
                student.admission_number
            )));
        }

        guard.next_student += 1;
        student.id = StudentId(guard.next_student);
        guard.students.insert(student.id, student.clone());
        Ok(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if !guard.students.contains_key(&student.id) {
            return Err(RepositoryError::NotFound);
        }
        if guard.students.values().any(|existing| {
            existing.id != student.id && existing.admission_number == student.admission_number
        }) {
            return Err(RepositoryError::Conflict(format!(
                "admission number {}",
                student.admission_number
            )));
        }

        guard.students.insert(student.id, student);
        Ok(())
    }

    fn enrol_student(
        &self,
        mut account: UserAccount,
        mut student: Student,
        mut profile: Profile,
    ) -> Result<Student, RepositoryError> {
        let mut guard = self.tables.lock().expect("directory mutex poisoned");
        if guard
            .accounts
            .values()
            .any(|existing| existing.username == account.username)
        {
            return Err(RepositoryError::Conflict(format!(
                "username {}",
                account.username
            )));
        }
        if guard
            .students
            .values()
            .any(|existing| existing.admission_number == student.admission_number)
        {
            return Err(RepositoryError::Conflict(format!(
                "admission number {}",
                student.admission_number
            )));
        }

        guard.next_user += 1;
        account.id = UserId(guard.next_user);
        guard.next_student += 1;
        student.id = StudentId(guard.next_student);
        student.user_id = account.id;
        profile.user_id = account.id;

        guard.accounts.insert(account.id, account);
        guard.profiles.insert(profile.user_id, profile);
        guard.students.insert(student.id, student.clone());
        Ok(student)
    }
}

#[derive(Default)]
struct NotificationLog {
    next_id: u64,
    events: Vec<Notification>,
}

#[derive(Default, Clone)]
pub struct InMemoryNotifications {
    log: Arc<Mutex<NotificationLog>>,
}

impl InMemoryNotifications {
    /// Every notification ever published, read or not.
    pub fn events(&self) -> Vec<Notification> {
        self.log.lock().expect("notification mutex poisoned").events.clone()
    }

    pub fn for_user(&self, user: UserId) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(|notification| notification.recipient == user)
            .collect()
    }
}

impl NotificationPublisher for InMemoryNotifications {
    fn publish(&self, mut notification: Notification) -> Result<Notification, NotificationError> {
        let mut guard = self.log.lock().expect("notification mutex poisoned");
        guard.next_id += 1;
        notification.id = NotificationId(guard.next_id);
        guard.events.push(notification.clone());
        Ok(notification)
    }

    fn unread(&self, user: UserId) -> Result<Vec<Notification>, NotificationError> {
        let guard = self.log.lock().expect("notification mutex poisoned");
        Ok(guard
            .events
            .iter()
            .filter(|notification| notification.recipient == user && !notification.is_read)
            .cloned()
            .collect())
    }

    fn mark_read(&self, ids: &[NotificationId]) -> Result<(), NotificationError> {
        let mut guard = self.log.lock().expect("notification mutex poisoned");
        for notification in guard
            .events
            .iter_mut()
            .filter(|notification| ids.contains(&notification.id))
        {
            notification.is_read = true;
        }
        Ok(())
    }
}
