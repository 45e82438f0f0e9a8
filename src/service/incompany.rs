use log::info;
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    dto::{FormStatus, IncompanyForm},
    errors::MyError,
    models::{IncompanyRequest, RequestStatus},
    PGPool,
};

use super::{crypto, email_queue, templates};

pub async fn create(form: IncompanyForm, config: &Config, pool: &PGPool) -> Result<FormStatus, MyError> {
    let form = form.validate()?;
    let mut tx = pool.begin().await?;

    db::user::upsert_by_email(&mut *tx, &form.contact(), &crypto::new_access_key()).await?;
    let request = db::incompany::create(&mut *tx, &form).await?;
    email_queue::enqueue(
        &mut *tx,
        &form.email,
        templates::incompany_confirmation(&form, &config.mail.from_name),
    )
    .await?;
    email_queue::enqueue(&mut *tx, &config.mail.admin_notify, templates::incompany_admin_notice(&form)).await?;

    tx.commit().await?;
    info!("incompany request {} from {} recorded", request.id, request.company);
    Ok(FormStatus::IncompanySuccess)
}

pub async fn get_all(status: Option<RequestStatus>, pool: &PGPool) -> Result<Vec<IncompanyRequest>, MyError> {
    Ok(db::incompany::get_all(status, pool).await?)
}

pub async fn set_status(id: Uuid, status: RequestStatus, pool: &PGPool) -> Result<IncompanyRequest, MyError> {
    let request = db::incompany::set_status(id, status, pool).await?;
    info!("incompany request {} is now {:?}", id, status);
    Ok(request)
}
