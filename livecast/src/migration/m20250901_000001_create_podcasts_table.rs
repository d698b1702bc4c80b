use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Podcasts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Podcasts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Podcasts::Title).string().not_null())
                    .col(ColumnDef::new(Podcasts::Description).text().null())
                    .col(ColumnDef::new(Podcasts::Transcription).text().null())
                    .col(ColumnDef::new(Podcasts::CoverImage).string().null())
                    .col(ColumnDef::new(Podcasts::Date).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Podcasts::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Podcasts::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Podcasts::StreamKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Podcasts::LiveSessionId).string().null())
                    .col(
                        ColumnDef::new(Podcasts::ActualStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Podcasts::ActualEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Podcasts::DurationMinutes).big_integer().null())
                    .col(
                        ColumnDef::new(Podcasts::IsRecording)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Podcasts::AudioFormat)
                            .string()
                            .not_null()
                            .default("webm"),
                    )
                    .col(ColumnDef::new(Podcasts::RecordedUrl).string().null())
                    .col(ColumnDef::new(Podcasts::RecordedSignedUrl).text().null())
                    .col(ColumnDef::new(Podcasts::RecordedFileName).string().null())
                    .col(ColumnDef::new(Podcasts::AudioSizeBytes).big_integer().null())
                    .col(
                        ColumnDef::new(Podcasts::CurrentListeners)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Podcasts::PeakListeners)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Podcasts::TotalListeners)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Podcasts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Podcasts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_podcasts_status")
                    .table(Podcasts::Table)
                    .col(Podcasts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_podcasts_live_session_id")
                    .table(Podcasts::Table)
                    .col(Podcasts::LiveSessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Podcasts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Podcasts {
    Table,
    Id,
    Title,
    Description,
    Transcription,
    CoverImage,
    Date,
    Status,
    OwnerId,
    StreamKey,
    LiveSessionId,
    ActualStart,
    ActualEnd,
    DurationMinutes,
    IsRecording,
    AudioFormat,
    RecordedUrl,
    RecordedSignedUrl,
    RecordedFileName,
    AudioSizeBytes,
    CurrentListeners,
    PeakListeners,
    TotalListeners,
    CreatedAt,
    UpdatedAt,
}
