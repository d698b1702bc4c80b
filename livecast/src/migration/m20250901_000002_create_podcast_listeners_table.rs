use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PodcastListeners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PodcastListeners::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PodcastListeners::PodcastId).uuid().not_null())
                    .col(ColumnDef::new(PodcastListeners::UserId).string().null())
                    .col(
                        ColumnDef::new(PodcastListeners::ConnectionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PodcastListeners::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PodcastListeners::LeftAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_podcast_listeners_podcast")
                            .from(PodcastListeners::Table, PodcastListeners::PodcastId)
                            .to(Podcasts::Table, Podcasts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_podcast_listeners_open")
                    .table(PodcastListeners::Table)
                    .col(PodcastListeners::PodcastId)
                    .col(PodcastListeners::ConnectionId)
                    .col(PodcastListeners::LeftAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PodcastListeners::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PodcastListeners {
    Table,
    Id,
    PodcastId,
    UserId,
    ConnectionId,
    JoinedAt,
    LeftAt,
}

#[derive(DeriveIden)]
enum Podcasts {
    Table,
    Id,
}
