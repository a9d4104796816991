use crate::infra::{seed_directory, SeededDirectory, Stores};
use clap::Args;
use interfaculty::error::AppError;
use interfaculty::workflows::transfer::{
    ApplicationView, Directory, FacultyId, Program, ReviewAction, Role, Semester,
    StudentRegistration, TransferServiceError, TransferSubmission, UserId,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Write the closing CSV export to this path instead of printing it.
    #[arg(long)]
    pub(crate) export_csv: Option<PathBuf>,
    /// Also walk a second applicant through an HOD rejection.
    #[arg(long)]
    pub(crate) with_rejection: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        export_csv,
        with_rejection,
    } = args;

    let stores = Stores::default();
    let seeded = seed_directory(&stores.directory).map_err(TransferServiceError::from)?;
    let service = stores.service();

    println!("Inter-faculty transfer demo");
    println!(
        "- {} faculties and {} programs seeded",
        seeded.faculties.len(),
        seeded.programs.len()
    );

    let computer_science = seeded_program(&seeded, "BSc Computer Science")?;
    let commerce = seeded_program(&seeded, "Bachelor of Commerce")?;
    let dean = dean_for(&stores, commerce.faculty)?;

    let student = service.register_student(StudentRegistration {
        username: "achieng.otieno".to_string(),
        password: "demo-password".to_string(),
        confirm_password: "demo-password".to_string(),
        first_name: "Achieng".to_string(),
        last_name: "Otieno".to_string(),
        email: "achieng.otieno@students.example.edu".to_string(),
        admission_number: "SCT/0013/2023".to_string(),
        current_program: computer_science.id,
        current_year: 2,
        phone: "0712345678".to_string(),
    })?;
    println!(
        "\nRegistered student {} in {}",
        student.admission_number, computer_science.name
    );

    let eligible: Vec<_> = service
        .eligible_programs(student.user_id)?
        .into_iter()
        .map(|program| program.name)
        .collect();
    println!("Eligible programs: {}", eligible.join(", "));

    let application = service.submit(
        student.user_id,
        TransferSubmission {
            requested_program: commerce.id,
            reason: "Wants to specialise in corporate finance".to_string(),
            academic_year: "2025/2026".to_string(),
            semester: Semester::First,
            address: Some("P.O. Box 190, Kakamega".to_string()),
            kcse: None,
        },
    )?;
    print_step("Submitted", &application);

    let application = service.hod_review(
        seeded.university_hod,
        application.id,
        ReviewAction::approve("Meets the transfer criteria"),
    )?;
    print_step("HOD review", &application);

    let application =
        service.dean_review(dean, application.id, ReviewAction::approve("Space available"))?;
    print_step("Dean review", &application);

    let application = service.registrar_review(
        seeded.registrar,
        application.id,
        ReviewAction::issue_admission("COM/0099/2026", Some("Welcome to SOBE".to_string())),
    )?;
    print_step("Registrar review", &application);
    println!(
        "  {} now holds admission number {}",
        application.student_name, application.admission_number
    );

    println!("\nNotifications delivered");
    for (label, user) in [
        ("student", student.user_id),
        ("university HOD", seeded.university_hod),
        ("SOBE dean", dean),
        ("registrar", seeded.registrar),
    ] {
        for notification in stores.notifications.for_user(user) {
            println!("  - [{label}] {}", notification.message);
        }
    }

    if with_rejection {
        demo_rejection(&stores, &seeded)?;
    }

    let summary = service.status_summary(seeded.registrar)?;
    println!(
        "\nRegistrar summary ({}): {} total | {} pending | {} approved | {} rejected",
        summary.scope_label,
        summary.counts.total,
        summary.counts.pending,
        summary.counts.approved,
        summary.counts.rejected
    );

    if let Some(faculty) = seeded.faculty("SOBE") {
        let report = service.faculty_report(seeded.admin, Some(&faculty.code))?;
        println!(
            "{} report: {} applications ({} completed)",
            faculty.name, report.counts.total, report.counts.completed
        );
    }

    let export = service.export_csv(seeded.admin)?;
    match export_csv {
        Some(path) => {
            std::fs::write(&path, &export.body)?;
            println!("\nCSV export written to {}", path.display());
        }
        None => {
            println!("\nCSV export ({})", export.filename);
            print!("{}", String::from_utf8_lossy(&export.body));
        }
    }

    Ok(())
}

fn demo_rejection(stores: &Stores, seeded: &SeededDirectory) -> Result<(), AppError> {
    let service = stores.service();
    let nursing = seeded_program(seeded, "BSc Nursing")?;
    let mathematics = seeded_program(seeded, "BSc Mathematics")?;
    let dean = dean_for(stores, mathematics.faculty)?;

    let student = service.register_student(StudentRegistration {
        username: "baraka.wafula".to_string(),
        password: "demo-password".to_string(),
        confirm_password: "demo-password".to_string(),
        first_name: "Baraka".to_string(),
        last_name: "Wafula".to_string(),
        email: "baraka.wafula@students.example.edu".to_string(),
        admission_number: "HNS/0042/2024".to_string(),
        current_program: nursing.id,
        current_year: 1,
        phone: "0733000111".to_string(),
    })?;

    let application = service.submit(
        student.user_id,
        TransferSubmission {
            requested_program: mathematics.id,
            reason: "Prefers pure sciences".to_string(),
            academic_year: "2025/2026".to_string(),
            semester: Semester::Second,
            address: None,
            kcse: None,
        },
    )?;
    let application = service.hod_review(
        seeded.university_hod,
        application.id,
        ReviewAction::reject("Grades insufficient"),
    )?;
    print_step("\nSecond applicant, HOD review", &application);

    match service.dean_review(dean, application.id, ReviewAction::approve("ok")) {
        Ok(view) => println!("  Unexpected dean decision: {}", view.status_label),
        Err(err) => println!("  Dean review blocked: {err}"),
    }
    Ok(())
}

fn print_step(step: &str, application: &ApplicationView) {
    println!(
        "{step}: application #{} {} -> {} is {}",
        application.id,
        application.current_program,
        application.requested_program,
        application.status_label
    );
    for (stage, comment) in [
        ("HOD", &application.hod_comment),
        ("Dean", &application.dean_comment),
        ("Registrar", &application.registrar_comment),
    ] {
        if let Some(comment) = comment {
            println!("  {stage} comment: {comment}");
        }
    }
}

fn seeded_program<'a>(
    seeded: &'a SeededDirectory,
    name: &str,
) -> Result<&'a Program, TransferServiceError> {
    seeded
        .program(name)
        .ok_or_else(|| TransferServiceError::NotFound {
            entity: "program",
            key: name.to_string(),
        })
}

fn dean_for(stores: &Stores, faculty: FacultyId) -> Result<UserId, TransferServiceError> {
    stores
        .directory
        .find_profile(Role::Dean, Some(faculty))?
        .map(|profile| profile.user_id)
        .ok_or_else(|| TransferServiceError::NotFound {
            entity: "dean for faculty",
            key: faculty.to_string(),
        })
}
