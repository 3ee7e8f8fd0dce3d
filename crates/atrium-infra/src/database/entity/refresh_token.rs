//! Refresh token entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub token_hash: String,
    pub issued_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
    pub revoked_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::RefreshToken {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            token_hash: model.token_hash,
            issued_at: model.issued_at.into(),
            expires_at: model.expires_at.into(),
            revoked_at: model.revoked_at.map(Into::into),
        }
    }
}

impl From<atrium_core::domain::RefreshToken> for ActiveModel {
    fn from(token: atrium_core::domain::RefreshToken) -> Self {
        Self {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token_hash: Set(token.token_hash),
            issued_at: Set(token.issued_at.into()),
            expires_at: Set(token.expires_at.into()),
            revoked_at: Set(token.revoked_at.map(Into::into)),
        }
    }
}
