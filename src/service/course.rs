use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::{
    db,
    dto::{CourseFilter, NewCourseDto, UpdateCourseDto},
    errors::MyError,
    models::{Course, CourseWithCount},
    PGPool,
};

pub async fn create(dto: NewCourseDto, pool: &PGPool) -> Result<Course, MyError> {
    let dto = dto.validate()?;
    let now = Utc::now();
    let course = Course {
        id: Uuid::new_v4(),
        name: dto.name,
        description: dto.description,
        course_date: dto.course_date,
        location: dto.location,
        price_cents: dto.price_cents,
        max_participants: dto.max_participants,
        active: dto.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    db::course::create(&course, pool).await?;
    info!("course {} '{}' created", course.id, course.name);
    Ok(course)
}

pub async fn get_all(filter: &CourseFilter, pool: &PGPool) -> Result<Vec<CourseWithCount>, MyError> {
    Ok(db::course::get_all(filter, pool).await?)
}

/// Active courses that have not started yet, as offered on the public site.
pub async fn get_open(pool: &PGPool) -> Result<Vec<CourseWithCount>, MyError> {
    let filter = CourseFilter {
        active: Some(true),
        from: Some(Utc::now()),
        ..Default::default()
    };
    get_all(&filter, pool).await
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<CourseWithCount, MyError> {
    Ok(db::course::get_with_count(id, pool).await?)
}

pub async fn update(id: Uuid, course_fields: UpdateCourseDto, pool: &PGPool) -> Result<CourseWithCount, MyError> {
    course_fields.validate()?;
    let course = db::course::get_with_count(id, pool).await?;
    if let Some(max) = course_fields.max_participants {
        if i64::from(max) < course.enrolled {
            return Err(MyError::bad_request(format!(
                "{} participants are already enrolled",
                course.enrolled
            )));
        }
    }
    db::course::set_fields(id, course_fields, pool).await?;
    Ok(db::course::get_with_count(id, pool).await?)
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::course::delete(id, pool).await {
        Ok(0) => Err(MyError::NotFound),
        Ok(_) => {
            info!("course {} deleted", id);
            Ok(())
        }
        Err(err) => match MyError::from(err) {
            MyError::Conflict => Err(MyError::bad_request(
                "course has enrollments; deactivate it instead",
            )),
            other => Err(other),
        },
    }
}
