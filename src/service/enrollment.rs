use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    dto::{EnrollForm, FormStatus, InterestForm},
    errors::MyError,
    models::{Course, ParticipantDetail, PaymentStatus},
    PGPool,
};

use super::{crypto, email_queue, interest, templates};

/// Payment status a fresh enrollment starts with.
pub fn initial_payment_status(course: &Course) -> PaymentStatus {
    if course.requires_payment() {
        PaymentStatus::Pending
    } else {
        PaymentStatus::Paid
    }
}

pub fn enrolled_status(course: &Course) -> FormStatus {
    if course.requires_payment() {
        FormStatus::EnrolledPaymentRequired
    } else {
        FormStatus::Enrolled
    }
}

/// Whether a course still takes enrollments at `now`.
pub fn is_open(course: &Course, now: DateTime<Utc>) -> bool {
    course.active && course.course_date > now
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    AlreadyEnrolled,
    Full,
    Admit(PaymentStatus),
}

/// Decides the enrollment of a contact in a locked, open course with `enrolled` seats taken.
pub fn admission(course: &Course, already_enrolled: bool, enrolled: i64) -> Admission {
    if already_enrolled {
        Admission::AlreadyEnrolled
    } else if course.is_full(enrolled) {
        Admission::Full
    } else {
        Admission::Admit(initial_payment_status(course))
    }
}

fn waitlist_interest(form: &EnrollForm, course: &Course) -> InterestForm {
    InterestForm {
        name: form.name.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        company: form.company.clone(),
        training_name: course.name.clone(),
        periods: Some(templates::format_day(&course.course_date)),
        comments: Some("waitlist: course was full at enrollment".to_string()),
    }
}

/// Admits the participant if the course still has a seat.
///
/// The course row stays locked for the whole transaction, so two requests for the
/// last seat are admitted one after the other and the second one sees the course full.
pub async fn enroll(form: EnrollForm, config: &Config, pool: &PGPool) -> Result<FormStatus, MyError> {
    let form = form.validate()?;
    let mut tx = pool.begin().await?;

    let course = match db::course::lock_by_id(&mut *tx, form.course_id).await? {
        Some(course) if is_open(&course, Utc::now()) => course,
        _ => {
            info!("enrollment for unavailable course {}", form.course_id);
            return Ok(FormStatus::CourseUnavailable);
        }
    };

    let contact = form.contact();
    let user = db::user::upsert_by_email(&mut *tx, &contact, &crypto::new_access_key()).await?;

    let already_enrolled = db::participant::find_active(&mut *tx, user.id, course.id).await?.is_some();
    let enrolled = db::course::count_active_participants(&mut *tx, course.id).await?;
    let payment_status = match admission(&course, already_enrolled, enrolled) {
        Admission::AlreadyEnrolled => {
            tx.commit().await?;
            info!("{} is already enrolled in {}", user.email, course.id);
            return Ok(FormStatus::AlreadyEnrolled);
        }
        Admission::Full => {
            let interest = waitlist_interest(&form, &course);
            if interest::record(&mut tx, &interest).await?.is_some() {
                email_queue::enqueue(
                    &mut *tx,
                    &user.email,
                    templates::waitlist_notice(&user.name, &course, &config.mail.from_name),
                )
                .await?;
            }
            tx.commit().await?;
            warn!("course {} is full ({} of {})", course.id, enrolled, course.max_participants);
            return Ok(FormStatus::CourseFull);
        }
        Admission::Admit(payment_status) => payment_status,
    };

    let participant = match db::participant::create(
        &mut *tx,
        user.id,
        course.id,
        payment_status,
        form.notes.as_deref(),
    )
    .await
    {
        Ok(participant) => participant,
        // partial unique index on (user, course)
        Err(err) => match MyError::from(err) {
            MyError::Conflict => return Ok(FormStatus::AlreadyEnrolled),
            other => return Err(other),
        },
    };

    email_queue::enqueue(
        &mut *tx,
        &user.email,
        templates::enrollment_confirmation(&user.name, &course, &config.mail.from_name),
    )
    .await?;
    email_queue::enqueue(
        &mut *tx,
        &config.mail.admin_notify,
        templates::enrollment_admin_notice(&contact, &course, enrolled + 1),
    )
    .await?;

    tx.commit().await?;
    info!(
        "enrolled {} in {} as {} ({:?})",
        user.email, course.name, participant.id, participant.payment_status
    );
    Ok(enrolled_status(&course))
}

pub async fn list_for_course(course_id: Uuid, pool: &PGPool) -> Result<Vec<ParticipantDetail>, MyError> {
    db::course::get_by_id(course_id, pool).await?;
    Ok(db::participant::list_for_course(course_id, pool).await?)
}

/// Changes the payment status; reactivating a cancelled enrollment needs a free seat.
pub async fn set_payment_status(
    participant_id: Uuid,
    payment_status: PaymentStatus,
    pool: &PGPool,
) -> Result<ParticipantDetail, MyError> {
    let current = db::participant::get_detail(participant_id, pool).await?;
    if current.payment_status == payment_status {
        return Ok(current);
    }

    if !current.payment_status.holds_seat() && payment_status.holds_seat() {
        let mut tx = pool.begin().await?;
        let course = db::course::lock_by_id(&mut *tx, current.course_id)
            .await?
            .ok_or(MyError::NotFound)?;
        let enrolled = db::course::count_active_participants(&mut *tx, course.id).await?;
        if course.is_full(enrolled) {
            return Err(MyError::CourseFull);
        }
        db::participant::set_payment_status(&mut *tx, participant_id, payment_status).await?;
        tx.commit().await?;
    } else {
        db::participant::set_payment_status(pool, participant_id, payment_status).await?;
    }

    info!(
        "payment status of {} changed from {:?} to {:?}",
        participant_id, current.payment_status, payment_status
    );
    Ok(db::participant::get_detail(participant_id, pool).await?)
}
