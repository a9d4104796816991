use super::machine::NotificationTemplate;

/// Names interpolated into notification text.
#[derive(Debug, Clone)]
pub(crate) struct MessageContext<'a> {
    pub(crate) student_name: &'a str,
    pub(crate) current_program: &'a str,
    pub(crate) requested_program: &'a str,
    pub(crate) requested_faculty: &'a str,
}

impl NotificationTemplate {
    pub(crate) fn render(&self, ctx: &MessageContext<'_>) -> String {
        match self {
            NotificationTemplate::ApplicationSubmitted => format!(
                "New transfer application from {} - {} to {}",
                ctx.student_name, ctx.current_program, ctx.requested_program
            ),
            NotificationTemplate::HodApproved => {
                "Your transfer application has been approved by HOD.".to_string()
            }
            NotificationTemplate::HodRejected { reason } => format!(
                "Your transfer application has been rejected by HOD. Reason: {reason}"
            ),
            NotificationTemplate::AwaitingDean => format!(
                "New transfer application pending for {} from {}",
                ctx.requested_faculty, ctx.student_name
            ),
            NotificationTemplate::DeanApproved => format!(
                "Your transfer application has been approved by the Dean of {}. \
                 Sent to Registrar for final approval.",
                ctx.requested_faculty
            ),
            NotificationTemplate::DeanRejected { reason } => format!(
                "Your transfer application has been rejected by the Dean. Reason: {reason}"
            ),
            NotificationTemplate::AwaitingRegistrar => format!(
                "New application from {} approved by Dean. Pending your review.",
                ctx.student_name
            ),
            NotificationTemplate::TransferCompleted { admission_number } => format!(
                "Your transfer has been approved! New admission number: {admission_number}. \
                 You are now in {}.",
                ctx.requested_program
            ),
            NotificationTemplate::RegistrarRejected { reason } => format!(
                "Your transfer application has been rejected by the Registrar. Reason: {reason}"
            ),
            NotificationTemplate::TransferArrivalForHod { admission_number } => format!(
                "Student {} has transferred to your faculty. New admission: {admission_number}",
                ctx.student_name
            ),
            NotificationTemplate::TransferArrivalForDean => format!(
                "Student {} has been approved by Registrar and joined your faculty.",
                ctx.student_name
            ),
        }
    }
}
