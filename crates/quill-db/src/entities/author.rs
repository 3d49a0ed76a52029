//! Author entity: the owner of posts and comments, and the authentication
//! principal resolved from a token's subject claim.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    /// Author UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique login name, referenced by the token `sub` claim
    #[sea_orm(unique)]
    pub username: String,

    /// Unique email address
    #[sea_orm(unique)]
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id password hash; plaintext is never stored
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Author writes posts
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    /// Author writes comments
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
