//! Subject lines and HTML bodies for notification emails.

use chrono::{DateTime, Utc};

use crate::catalog::Resource;
use crate::record::{Consultation, Download};

/// Subject of staff notifications for consultation requests.
pub const CONSULTATION_SUBJECT: &str = "New Consultation Request";

/// Render the staff notification for a consultation request.
#[must_use]
pub fn consultation_body(consultation: &Consultation, submitted_at: DateTime<Utc>) -> String {
    let mut html = String::from("<h2>New Consultation Request</h2>\n");
    push_field(&mut html, "Name", &consultation.name);
    push_field(&mut html, "Email", &consultation.email);
    if let Some(company) = non_empty(consultation.company.as_deref()) {
        push_field(&mut html, "Company", company);
    }
    if let Some(phone) = non_empty(consultation.phone.as_deref()) {
        push_field(&mut html, "Phone", phone);
    }
    push_field(&mut html, "Country", &consultation.country);
    push_field(&mut html, "Employees to Hire", &consultation.employees);
    if let Some(notes) = non_empty(consultation.notes.as_deref()) {
        push_field(&mut html, "Notes", notes);
    }
    push_field(
        &mut html,
        "Submitted",
        &submitted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    html
}

/// Subject of the email sent to a download requester.
#[must_use]
pub fn download_subject(resource: &Resource) -> String {
    format!("Your {} Download", resource.display_name)
}

/// Render the email that delivers a download link.
#[must_use]
pub fn download_body(
    download: &Download,
    resource: &Resource,
    url: &str,
    signature: &str,
) -> String {
    let name = escape_html(&download.name);
    let title = escape_html(resource.display_name);
    let url = escape_html(url);
    let signature = escape_html(signature);

    format!(
        r#"<h2>Thank you for your interest!</h2>
<p>Hi {name},</p>
<p>As requested, here is your download link for the <strong>{title}</strong>:</p>
<p style="margin: 20px 0;">
  <a href="{url}" style="display: inline-block; padding: 12px 24px; background-color: #14B8A6; color: white; text-decoration: none; border-radius: 6px; font-weight: 600;">Download {title}</a>
</p>
<p>If the button doesn't work, you can copy and paste this link into your browser:</p>
<p style="color: #666; word-break: break-all;">{url}</p>
<p>Best regards,<br>{signature}</p>
"#
    )
}

fn push_field(html: &mut String, label: &str, value: &str) {
    html.push_str("<p><strong>");
    html.push_str(label);
    html.push_str(":</strong> ");
    html.push_str(&escape_html(value));
    html.push_str("</p>\n");
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Escape text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
