use chrono::{DateTime, Utc};

use crate::{
    dto::{ContactDetails, IncompanyForm, InterestForm},
    models::Course,
};

pub const ENROLLMENT_CONFIRMATION: &str = "enrollment_confirmation";
pub const ENROLLMENT_ADMIN_NOTICE: &str = "enrollment_admin_notice";
pub const WAITLIST_NOTICE: &str = "waitlist_notice";
pub const INTEREST_CONFIRMATION: &str = "interest_confirmation";
pub const INTEREST_ADMIN_NOTICE: &str = "interest_admin_notice";
pub const INCOMPANY_CONFIRMATION: &str = "incompany_confirmation";
pub const INCOMPANY_ADMIN_NOTICE: &str = "incompany_admin_notice";
pub const CERTIFICATE_AVAILABLE: &str = "certificate_available";
pub const PORTAL_ACCESS: &str = "portal_access";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub template: &'static str,
    pub subject: String,
    pub body: String,
}

/// Replaces every `{{key}}` with its value in a single pass; unknown placeholders are left
/// untouched and substituted values are never expanded again.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(len) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..len];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + len + 4]),
        }
        rest = &after[len + 2..];
    }
    out.push_str(rest);
    out
}

pub fn format_price(cents: i64) -> String {
    format!("€{}.{:02}", cents / 100, cents % 100)
}

pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%d-%m-%Y %H:%M").to_string()
}

pub fn format_day(dt: &DateTime<Utc>) -> String {
    dt.format("%d-%m-%Y").to_string()
}

fn optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

const ENROLLMENT_BODY: &str = "Dear {{name}},

Thank you for enrolling in {{course}}.

Date: {{date}}
Location: {{location}}
{{payment}}
We look forward to seeing you.

Kind regards,
{{sender}}";

pub fn enrollment_confirmation(name: &str, course: &Course, sender: &str) -> RenderedEmail {
    let payment = if course.requires_payment() {
        format!(
            "Course fee: {}\nYour seat is reserved; you will receive an invoice shortly.\n",
            format_price(course.price_cents)
        )
    } else {
        String::new()
    };
    RenderedEmail {
        template: ENROLLMENT_CONFIRMATION,
        subject: format!("Enrollment confirmation: {}", course.name),
        body: fill_placeholders(
            ENROLLMENT_BODY,
            &[
                ("name", name),
                ("course", &course.name),
                ("date", &format_date(&course.course_date)),
                ("location", &course.location),
                ("payment", &payment),
                ("sender", sender),
            ],
        ),
    }
}

pub fn enrollment_admin_notice(contact: &ContactDetails, course: &Course, enrolled: i64) -> RenderedEmail {
    RenderedEmail {
        template: ENROLLMENT_ADMIN_NOTICE,
        subject: format!("New enrollment: {}", course.name),
        body: format!(
            "New enrollment for {} on {}.\n\nName: {}\nEmail: {}\nPhone: {}\nCompany: {}\n\nSeats taken: {} of {}\n",
            course.name,
            format_date(&course.course_date),
            contact.name,
            contact.email,
            optional(&contact.phone),
            optional(&contact.company),
            enrolled,
            course.max_participants,
        ),
    }
}

pub fn waitlist_notice(name: &str, course: &Course, sender: &str) -> RenderedEmail {
    RenderedEmail {
        template: WAITLIST_NOTICE,
        subject: format!("Waiting list: {}", course.name),
        body: format!(
            "Dear {name},\n\n{} on {} is fully booked. We have put you on the waiting list \
            and will contact you as soon as a seat opens up or a new date is planned.\n\nKind regards,\n{sender}",
            course.name,
            format_day(&course.course_date),
        ),
    }
}

pub fn interest_confirmation(form: &InterestForm, sender: &str) -> RenderedEmail {
    RenderedEmail {
        template: INTEREST_CONFIRMATION,
        subject: format!("Your interest in {}", form.training_name),
        body: format!(
            "Dear {},\n\nThank you for your interest in {}. We will let you know when a date \
            that suits you is available.\n\nKind regards,\n{sender}",
            form.name, form.training_name,
        ),
    }
}

pub fn interest_admin_notice(form: &InterestForm) -> RenderedEmail {
    RenderedEmail {
        template: INTEREST_ADMIN_NOTICE,
        subject: format!("New interest: {}", form.training_name),
        body: format!(
            "Training: {}\nName: {}\nEmail: {}\nPhone: {}\nCompany: {}\nPreferred periods: {}\nComments: {}\n",
            form.training_name,
            form.name,
            form.email,
            optional(&form.phone),
            optional(&form.company),
            optional(&form.periods),
            optional(&form.comments),
        ),
    }
}

pub fn incompany_confirmation(form: &IncompanyForm, sender: &str) -> RenderedEmail {
    RenderedEmail {
        template: INCOMPANY_CONFIRMATION,
        subject: format!("Your in-company request: {}", form.training_topic),
        body: format!(
            "Dear {},\n\nWe have received your request for an in-company training on {} for {}. \
            We will contact you within two working days.\n\nKind regards,\n{sender}",
            form.contact_name, form.training_topic, form.company,
        ),
    }
}

pub fn incompany_admin_notice(form: &IncompanyForm) -> RenderedEmail {
    let participants = form
        .participant_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    RenderedEmail {
        template: INCOMPANY_ADMIN_NOTICE,
        subject: format!("New in-company request: {}", form.company),
        body: format!(
            "Company: {}\nContact: {}\nEmail: {}\nPhone: {}\nTopic: {}\nParticipants: {}\nPeriod: {}\nMessage: {}\n",
            form.company,
            form.contact_name,
            form.email,
            optional(&form.phone),
            form.training_topic,
            participants,
            optional(&form.preferred_period),
            optional(&form.message),
        ),
    }
}

pub fn certificate_available(name: &str, course_name: &str, link: &str, sender: &str) -> RenderedEmail {
    RenderedEmail {
        template: CERTIFICATE_AVAILABLE,
        subject: format!("Your certificate for {course_name}"),
        body: format!(
            "Dear {name},\n\nYour certificate for {course_name} is ready. You can download it here:\n\n{link}\n\n\
            Kind regards,\n{sender}"
        ),
    }
}

pub fn portal_access(name: &str, link: &str, sender: &str) -> RenderedEmail {
    RenderedEmail {
        template: PORTAL_ACCESS,
        subject: "Your participant portal access".to_string(),
        body: format!(
            "Dear {name},\n\nUse the link below to open your participant portal. It shows your \
            enrollments and certificates.\n\n{link}\n\nDo not share this link.\n\nKind regards,\n{sender}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn course(price_cents: i64) -> Course {
        Course {
            id: Uuid::nil(),
            name: "BHV Basic".to_string(),
            description: None,
            course_date: Utc.with_ymd_and_hms(2026, 11, 3, 9, 30, 0).unwrap(),
            location: "Amersfoort".to_string(),
            price_cents,
            max_participants: 12,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn placeholders_are_replaced() {
        let out = fill_placeholders("{{a}} and {{b}} and {{c}}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "1 and 2 and {{c}}");
        assert_eq!(fill_placeholders("{{a}} {{unclosed", &[("a", "1")]), "1 {{unclosed");
    }

    #[test]
    fn substituted_values_are_not_expanded() {
        let out = fill_placeholders(
            "{{name}} / {{course}} / {{location}} / {{number}}",
            &[
                ("name", "{{number}}"),
                ("course", "BHV {{location}}"),
                ("location", "Zwolle"),
                ("number", "2026-0001"),
            ],
        );
        assert_eq!(out, "{{number}} / BHV {{location}} / Zwolle / 2026-0001");
    }

    #[test]
    fn prices_render_with_cents() {
        assert_eq!(format_price(19950), "€199.50");
        assert_eq!(format_price(5), "€0.05");
    }

    #[test]
    fn paid_course_confirmation_mentions_fee() {
        let mail = enrollment_confirmation("Anna", &course(19900), "Training Office");
        assert_eq!(mail.template, ENROLLMENT_CONFIRMATION);
        assert_eq!(mail.subject, "Enrollment confirmation: BHV Basic");
        assert!(mail.body.contains("Dear Anna,"));
        assert!(mail.body.contains("Date: 03-11-2026 09:30"));
        assert!(mail.body.contains("Course fee: €199.00"));
        assert!(!mail.body.contains("{{"));
    }

    #[test]
    fn free_course_confirmation_has_no_fee() {
        let mail = enrollment_confirmation("Anna", &course(0), "Training Office");
        assert!(!mail.body.contains("Course fee"));
    }

    #[test]
    fn admin_notice_lists_missing_fields_as_dash() {
        let contact = ContactDetails {
            name: "Anna".into(),
            email: "anna@example.com".into(),
            phone: None,
            company: None,
        };
        let mail = enrollment_admin_notice(&contact, &course(0), 4);
        assert!(mail.body.contains("Phone: -"));
        assert!(mail.body.contains("Seats taken: 4 of 12"));
    }
}
