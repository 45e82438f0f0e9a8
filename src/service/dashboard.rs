use std::collections::BTreeMap;

use chrono::{Datelike, TimeZone, Utc};

use crate::{
    db::{self, stats::DashboardCounts},
    dto::CourseFilter,
    errors::MyError,
    models::CourseWithCount,
    PGPool,
};

const UPCOMING_LIMIT: i64 = 5;

#[derive(Debug, serde::Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub upcoming: Vec<CourseWithCount>,
}

#[derive(Debug, PartialEq, serde::Serialize)]
pub struct PlanningCourse {
    pub id: uuid::Uuid,
    pub name: String,
    pub course_date: chrono::DateTime<Utc>,
    pub location: String,
    pub active: bool,
    pub enrolled: i64,
    pub max_participants: i32,
    pub fill_percentage: u32,
}

#[derive(Debug, PartialEq, serde::Serialize)]
pub struct PlanningMonth {
    pub month: u32,
    pub courses: Vec<PlanningCourse>,
    pub enrolled: i64,
    pub capacity: i64,
}

pub fn fill_percentage(enrolled: i64, max_participants: i32) -> u32 {
    if max_participants <= 0 {
        return 0;
    }
    ((enrolled.max(0) * 100) / i64::from(max_participants)) as u32
}

pub async fn dashboard(pool: &PGPool) -> Result<Dashboard, MyError> {
    Ok(Dashboard {
        counts: db::stats::dashboard_counts(pool).await?,
        upcoming: db::course::upcoming(Utc::now(), UPCOMING_LIMIT, pool).await?,
    })
}

/// Groups courses by calendar month, keeping date order inside each month.
pub fn group_by_month(courses: Vec<CourseWithCount>) -> Vec<PlanningMonth> {
    let mut months: BTreeMap<u32, PlanningMonth> = BTreeMap::new();
    for entry in courses {
        let month = entry.course.course_date.month();
        let bucket = months.entry(month).or_insert_with(|| PlanningMonth {
            month,
            courses: Vec::new(),
            enrolled: 0,
            capacity: 0,
        });
        bucket.enrolled += entry.enrolled;
        bucket.capacity += i64::from(entry.course.max_participants);
        bucket.courses.push(PlanningCourse {
            id: entry.course.id,
            fill_percentage: fill_percentage(entry.enrolled, entry.course.max_participants),
            name: entry.course.name,
            course_date: entry.course.course_date,
            location: entry.course.location,
            active: entry.course.active,
            enrolled: entry.enrolled,
            max_participants: entry.course.max_participants,
        });
    }
    let mut months: Vec<PlanningMonth> = months.into_values().collect();
    for month in &mut months {
        month.courses.sort_by_key(|c| c.course_date);
    }
    months
}

pub async fn planning(year: i32, pool: &PGPool) -> Result<Vec<PlanningMonth>, MyError> {
    let from = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| MyError::bad_request("invalid year"))?;
    let to = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| MyError::bad_request("invalid year"))?;
    let filter = CourseFilter {
        from: Some(from),
        to: Some(to),
        ..Default::default()
    };
    Ok(group_by_month(db::course::get_all(&filter, pool).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;
    use uuid::Uuid;

    fn entry(month: u32, day: u32, max: i32, enrolled: i64) -> CourseWithCount {
        CourseWithCount {
            course: Course {
                id: Uuid::new_v4(),
                name: format!("course {month}-{day}"),
                description: None,
                course_date: Utc.with_ymd_and_hms(2026, month, day, 9, 0, 0).unwrap(),
                location: "Utrecht".to_string(),
                price_cents: 0,
                max_participants: max,
                active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            enrolled,
        }
    }

    #[test]
    fn fill_percentage_rounds_down() {
        assert_eq!(fill_percentage(1, 3), 33);
        assert_eq!(fill_percentage(12, 12), 100);
        assert_eq!(fill_percentage(5, 0), 0);
    }

    #[test]
    fn courses_are_grouped_per_month() {
        let months = group_by_month(vec![
            entry(3, 20, 10, 5),
            entry(1, 5, 8, 8),
            entry(3, 2, 10, 1),
        ]);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, 1);
        assert_eq!(months[0].courses[0].fill_percentage, 100);
        assert_eq!(months[1].month, 3);
        assert_eq!(months[1].enrolled, 6);
        assert_eq!(months[1].capacity, 20);
        assert_eq!(months[1].courses[0].name, "course 3-2");
        assert_eq!(months[1].courses[1].name, "course 3-20");
    }
}
