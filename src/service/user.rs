use log::info;
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    dto::{UpdateUserDto, UserFilter},
    errors::MyError,
    models::{CertificateDetail, ParticipantDetail, User},
    PGPool,
};

use super::{crypto, email_queue, templates};

#[derive(Debug, serde::Serialize)]
pub struct UserOverview {
    pub user: User,
    pub enrollments: Vec<ParticipantDetail>,
    pub certificates: Vec<CertificateDetail>,
}

pub async fn get_all(filter: &UserFilter, pool: &PGPool) -> Result<Vec<User>, MyError> {
    Ok(db::user::get_all(filter, pool).await?)
}

pub async fn get_overview(id: Uuid, pool: &PGPool) -> Result<UserOverview, MyError> {
    let user = db::user::get_by_id(id, pool).await?;
    Ok(UserOverview {
        enrollments: db::participant::list_for_user(user.id, pool).await?,
        certificates: db::certificate::list_for_user(user.id, pool).await?,
        user,
    })
}

pub async fn update(id: Uuid, user_fields: UpdateUserDto, pool: &PGPool) -> Result<User, MyError> {
    user_fields.validate()?;
    if db::user::set_fields(id, user_fields, pool).await? > 0 {
        info!("user {} updated", id);
    }
    Ok(db::user::get_by_id(id, pool).await?)
}

pub async fn set_active(id: Uuid, active: bool, pool: &PGPool) -> Result<User, MyError> {
    let fields = UpdateUserDto {
        active: Some(active),
        ..Default::default()
    };
    update(id, fields, pool).await
}

/// Issues a new access key, invalidating portal links sent earlier.
pub async fn rotate_access_key(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::user::set_access_key(id, &crypto::new_access_key(), pool).await? {
        0 => Err(MyError::NotFound),
        _ => {
            info!("access key of user {} rotated", id);
            Ok(())
        }
    }
}

pub fn portal_link(config: &Config, access_key: &str) -> String {
    format!("{}/portal?key={}", config.public_base_url, access_key)
}

pub async fn send_portal_access(id: Uuid, config: &Config, pool: &PGPool) -> Result<(), MyError> {
    let user = db::user::get_by_id(id, pool).await?;
    if !user.active {
        return Err(MyError::bad_request("user is inactive"));
    }
    let link = portal_link(config, &user.access_key);
    email_queue::enqueue(
        pool,
        &user.email,
        templates::portal_access(&user.name, &link, &config.mail.from_name),
    )
    .await?;
    info!("portal access mail queued for {}", user.email);
    Ok(())
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::user::delete(id, pool).await? {
        0 => Err(MyError::NotFound),
        _ => {
            info!("user {} deleted", id);
            Ok(())
        }
    }
}
