use std::io::Write;

use chrono::{DateTime, Utc};

use super::reports::ApplicationView;

pub const EXPORT_HEADER: [&str; 15] = [
    "Application ID",
    "Date",
    "Student Name",
    "Admission Number",
    "Current Program",
    "Current Faculty",
    "Requested Program",
    "Requested Faculty",
    "Status",
    "Academic Year",
    "Semester",
    "HOD Comment",
    "Dean Comment",
    "Registrar Comment",
    "New Admission Number",
];

/// A rendered export ready to hand back as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Io(#[from] std::io::Error),
}

pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("transfer_applications_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Write the header plus one row per application.
pub fn write_csv<W: Write>(writer: W, rows: &[ApplicationView]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        let id = row.id.to_string();
        let date = row.created_at.format("%Y-%m-%d %H:%M").to_string();
        writer.write_record([
            id.as_str(),
            date.as_str(),
            row.student_name.as_str(),
            row.admission_number.as_str(),
            row.current_program.as_str(),
            row.current_faculty.as_str(),
            row.requested_program.as_str(),
            row.requested_faculty.as_str(),
            row.status_label,
            row.academic_year.as_str(),
            row.semester_label,
            row.hod_comment.as_deref().unwrap_or_default(),
            row.dean_comment.as_deref().unwrap_or_default(),
            row.registrar_comment.as_deref().unwrap_or_default(),
            row.new_admission_number.as_deref().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn render_csv(rows: &[ApplicationView], at: DateTime<Utc>) -> Result<CsvExport, ExportError> {
    let mut body = Vec::new();
    write_csv(&mut body, rows)?;
    Ok(CsvExport {
        filename: export_filename(at),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::transfer::domain::{
        ApplicationId, Semester, StudentId, TransferStatus,
    };
    use chrono::TimeZone;

    fn completed_row() -> ApplicationView {
        let created_at = Utc
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        ApplicationView {
            id: ApplicationId(7),
            status: TransferStatus::Completed,
            status_label: TransferStatus::Completed.label(),
            student_id: StudentId(3),
            student_name: "Achieng Otieno".to_string(),
            admission_number: "COM/0099/2026".to_string(),
            current_program: "BSc Computer Science".to_string(),
            current_faculty: "School of Computing & Information Technology".to_string(),
            requested_program: "BCom Finance".to_string(),
            requested_faculty: "School of Business & Economics".to_string(),
            reason: "Career change".to_string(),
            academic_year: "2025/2026".to_string(),
            semester: Semester::Second,
            semester_label: Semester::Second.label(),
            created_at,
            updated_at: created_at,
            hod_comment: Some("ok".to_string()),
            dean_comment: None,
            registrar_comment: Some("welcome, \"finance\"".to_string()),
            new_admission_number: Some("COM/0099/2026".to_string()),
        }
    }

    #[test]
    fn export_writes_header_and_display_labels() {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 17, 8, 5, 9)
            .single()
            .expect("valid timestamp");
        let export = render_csv(&[completed_row()], at).expect("renders");
        assert_eq!(export.filename, "transfer_applications_20261017_080509.csv");

        let text = String::from_utf8(export.body).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "Application ID,Date,Student Name,Admission Number,Current Program,\
                 Current Faculty,Requested Program,Requested Faculty,Status,Academic Year,\
                 Semester,HOD Comment,Dean Comment,Registrar Comment,New Admission Number"
            )
        );

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let rows: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("parses back");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "7");
        assert_eq!(&row[1], "2026-03-14 09:30");
        assert_eq!(&row[8], "Completed");
        assert_eq!(&row[10], "Semester 2");
        assert_eq!(&row[12], "");
        assert_eq!(&row[13], "welcome, \"finance\"");
    }

    #[test]
    fn empty_export_still_has_header() {
        let export = render_csv(&[], Utc::now()).expect("renders");
        let text = String::from_utf8(export.body).expect("utf8");
        assert_eq!(text.lines().count(), 1);
    }
}
