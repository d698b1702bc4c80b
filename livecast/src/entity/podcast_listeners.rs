use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One join/leave interval of a relay connection in a podcast room
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "podcast_listeners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub podcast_id: Uuid,
    pub user_id: Option<String>,
    pub connection_id: String,
    pub joined_at: DateTimeWithTimeZone,
    pub left_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::podcasts::Entity",
        from = "Column::PodcastId",
        to = "super::podcasts::Column::Id",
        on_delete = "Cascade"
    )]
    Podcast,
}

impl Related<super::podcasts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Podcast.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
