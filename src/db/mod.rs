pub mod user;
pub mod course;
pub mod participant;
pub mod interest;
pub mod incompany;
pub mod certificate;
pub mod email_queue;
pub mod stats;

use crate::{config::Config, dto::FieldValue, PGPool};
use log::info;
use sqlx::{postgres::PgPoolOptions, Postgres, QueryBuilder};

pub async fn init_db_pool(config: &Config) -> Result<PGPool, sqlx::Error> {
    info!("connecting to database with at most {} connections", config.max_connections);
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("connected to postgresql");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    info!("database migrations applied");
    Ok(pool)
}

/// Substring pattern for ILIKE with the wildcard characters of `q` matched literally.
pub(crate) fn like_pattern(q: &str) -> String {
    let escaped = q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Starts `UPDATE <table> SET col = $n, ...` for the given fields; the caller appends the WHERE clause.
pub(crate) fn update_builder<'a>(
    table: &str,
    fields: Vec<(&'static str, FieldValue)>,
) -> QueryBuilder<'a, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("UPDATE {table} SET "));
    let mut separated = query_builder.separated(", ");
    for (column, value) in fields {
        separated.push(format!("{column} = "));
        match value {
            FieldValue::Text(v) => separated.push_bind_unseparated(v),
            FieldValue::OptionalText(v) => separated.push_bind_unseparated(v),
            FieldValue::BigInt(v) => separated.push_bind_unseparated(v),
            FieldValue::Int(v) => separated.push_bind_unseparated(v),
            FieldValue::Bool(v) => separated.push_bind_unseparated(v),
            FieldValue::Timestamp(v) => separated.push_bind_unseparated(v),
        };
    }
    separated.push("updated_at = now()");
    query_builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Execute;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Zwolle"), "%Zwolle%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn update_builder_binds_every_field() {
        let mut builder = update_builder(
            "courses",
            vec![
                ("name", FieldValue::Text("BHV".into())),
                ("max_participants", FieldValue::Int(12)),
            ],
        );
        builder.push(" WHERE id = ");
        builder.push_bind(uuid::Uuid::nil());
        let query = builder.build();
        assert_eq!(
            query.sql(),
            "UPDATE courses SET name = $1, max_participants = $2, updated_at = now() WHERE id = $3"
        );
    }
}
