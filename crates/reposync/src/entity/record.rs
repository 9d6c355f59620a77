//! Record entity - one tracked repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title, overwritten from the API's title field.
    pub title: String,

    pub created_at: DateTimeWithTimeZone,

    /// Sync eligibility is ordered by this column, oldest first.
    pub modified_at: DateTimeWithTimeZone,

    /// Last successful sync, `None` until the first one.
    pub synced_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::record_field::Entity")]
    Fields,
}

impl Related<super::record_field::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fields.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
