use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::SeedGroup;
use crate::entity::{comment, group, post};

/// Insert configured groups whose slug does not exist yet.
pub async fn seed_groups(db: &DatabaseConnection, groups: &[SeedGroup]) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for seed in groups {
        let model = group::ActiveModel {
            title: Set(seed.title.clone()),
            slug: Set(seed.slug.clone()),
            description: Set(seed.description.clone()),
            ..Default::default()
        };

        let result = group::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(group::Column::Slug)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(rows) if rows > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new groups", inserted);
    }

    Ok(())
}

fn index_sql(db: &DatabaseConnection, stmt: &IndexCreateStatement) -> String {
    match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    }
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = index_sql(db, &stmt);
    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure the indexes behind the default orderings exist.
///
/// SeaORM's schema-sync only creates indexes declared on single columns, so
/// the composite ones are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Every listing: ORDER BY pub_date DESC, id DESC
    create_index(
        db,
        "idx_post_pub_date_id",
        Index::create()
            .if_not_exists()
            .name("idx_post_pub_date_id")
            .table(post::Entity)
            .col(post::Column::PubDate)
            .col(post::Column::Id)
            .to_owned(),
    )
    .await;

    // Profile listing: WHERE author_id = ? ORDER BY pub_date DESC
    create_index(
        db,
        "idx_post_author_pub_date",
        Index::create()
            .if_not_exists()
            .name("idx_post_author_pub_date")
            .table(post::Entity)
            .col(post::Column::AuthorId)
            .col(post::Column::PubDate)
            .to_owned(),
    )
    .await;

    // Post detail: WHERE post_id = ? ORDER BY created DESC
    create_index(
        db,
        "idx_comment_post_created",
        Index::create()
            .if_not_exists()
            .name("idx_comment_post_created")
            .table(comment::Entity)
            .col(comment::Column::PostId)
            .col(comment::Column::Created)
            .to_owned(),
    )
    .await;

    Ok(())
}
