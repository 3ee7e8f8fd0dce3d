//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use atrium_core::domain::{
    Appointment, AppointmentStatus, ContactRequest, Customer, CustomerNote, EntityStatus,
    PasswordResetToken, Project, ProjectStatus, RefreshToken, RequestStatus, Role, User,
};
use atrium_core::error::RepoError;
use atrium_core::ports::{
    AppointmentRepository, ContactRequestRepository, CustomerRepository, Page,
    PasswordResetTokenRepository, ProjectRepository, RefreshTokenRepository, RoleRepository,
    UserRepository,
};

use super::entity::appointment::{self, Entity as AppointmentEntity};
use super::entity::contact_request::{self, Entity as ContactRequestEntity};
use super::entity::customer::{self, Entity as CustomerEntity};
use super::entity::customer_note::{self, Entity as CustomerNoteEntity};
use super::entity::password_reset_token::{self, Entity as PasswordResetTokenEntity};
use super::entity::project::{self, Entity as ProjectEntity};
use super::entity::refresh_token::{self, Entity as RefreshTokenEntity};
use super::entity::role::{self, Entity as RoleEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_write_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL role repository.
pub type PostgresRoleRepository = PostgresBaseRepository<RoleEntity>;

/// PostgreSQL customer repository.
pub type PostgresCustomerRepository = PostgresBaseRepository<CustomerEntity>;

/// PostgreSQL appointment repository.
pub type PostgresAppointmentRepository = PostgresBaseRepository<AppointmentEntity>;

/// PostgreSQL project repository.
pub type PostgresProjectRepository = PostgresBaseRepository<ProjectEntity>;

/// PostgreSQL contact request repository.
pub type PostgresContactRequestRepository = PostgresBaseRepository<ContactRequestEntity>;

/// PostgreSQL refresh token repository.
pub type PostgresRefreshTokenRepository = PostgresBaseRepository<RefreshTokenEntity>;

/// PostgreSQL password reset token repository.
pub type PostgresPasswordResetTokenRepository = PostgresBaseRepository<PasswordResetTokenEntity>;

/// Mask an email for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let masked_local = if local.len() > 1 {
            format!("{}***", &local[..1])
        } else {
            "***".to_string()
        };
        format!("{masked_local}{domain}")
    } else {
        "***".to_string()
    }
}

fn query_err(e: sea_orm::DbErr) -> RepoError {
    RepoError::Query(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<User>, RepoError> {
        let mut query = UserEntity::find().order_by_asc(user::Column::CreatedAt);
        if active_only {
            query = query.filter(user::Column::Status.eq(EntityStatus::Active.as_str()));
        }

        let result = query.all(&self.db).await.map_err(query_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError> {
        let result = RoleEntity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Role>, RepoError> {
        let result = RoleEntity::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepoError> {
        let result = CustomerEntity::find()
            .filter(customer::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<EntityStatus>,
    ) -> Result<Page<Customer>, RepoError> {
        let mut query = CustomerEntity::find();
        if let Some(status) = status {
            query = query.filter(customer::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await.map_err(query_err)?;
        let items = query
            .order_by_desc(customer::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(query_err)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page { items, total })
    }

    async fn count(&self, status: Option<EntityStatus>) -> Result<u64, RepoError> {
        let mut query = CustomerEntity::find();
        if let Some(status) = status {
            query = query.filter(customer::Column::Status.eq(status.as_str()));
        }
        query.count(&self.db).await.map_err(query_err)
    }

    async fn add_note(&self, note: CustomerNote) -> Result<CustomerNote, RepoError> {
        let active: customer_note::ActiveModel = note.into();
        let model = active.insert(&self.db).await.map_err(map_write_err)?;
        Ok(model.into())
    }

    async fn notes_for(&self, customer_id: Uuid) -> Result<Vec<CustomerNote>, RepoError> {
        let result = CustomerNoteEntity::find()
            .filter(customer_note::Column::CustomerId.eq(customer_id))
            .order_by_asc(customer_note::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<AppointmentStatus>,
        upcoming_only: bool,
    ) -> Result<Page<Appointment>, RepoError> {
        let mut query = AppointmentEntity::find();
        if let Some(status) = status {
            query = query.filter(appointment::Column::Status.eq(status.as_str()));
        }
        if upcoming_only {
            query = query
                .filter(appointment::Column::Status.eq(AppointmentStatus::Scheduled.as_str()))
                .filter(appointment::Column::ScheduledAt.gt(Utc::now()));
        }

        let total = query.clone().count(&self.db).await.map_err(query_err)?;
        let items = query
            .order_by_asc(appointment::Column::ScheduledAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(query_err)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page { items, total })
    }

    async fn count(&self, status: Option<AppointmentStatus>) -> Result<u64, RepoError> {
        let mut query = AppointmentEntity::find();
        if let Some(status) = status {
            query = query.filter(appointment::Column::Status.eq(status.as_str()));
        }
        query.count(&self.db).await.map_err(query_err)
    }

    async fn upcoming_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Appointment>, RepoError> {
        let result = AppointmentEntity::find()
            .filter(appointment::Column::Status.eq(AppointmentStatus::Scheduled.as_str()))
            .filter(appointment::Column::ScheduledAt.gt(now))
            .filter(appointment::Column::ScheduledAt.lte(now + window))
            .order_by_asc(appointment::Column::ScheduledAt)
            .all(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<ProjectStatus>,
    ) -> Result<Page<Project>, RepoError> {
        let mut query = ProjectEntity::find();
        if let Some(status) = status {
            query = query.filter(project::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await.map_err(query_err)?;
        let items = query
            .order_by_desc(project::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(query_err)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page { items, total })
    }
}

#[async_trait]
impl ContactRequestRepository for PostgresContactRequestRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<RequestStatus>,
        assigned: Option<bool>,
        assigned_to: Option<Uuid>,
    ) -> Result<Page<ContactRequest>, RepoError> {
        let mut query = ContactRequestEntity::find();
        if let Some(status) = status {
            query = query.filter(contact_request::Column::Status.eq(status.as_str()));
        }
        match assigned {
            Some(true) => {
                query = query.filter(contact_request::Column::AssignedTo.is_not_null());
            }
            Some(false) => {
                query = query.filter(contact_request::Column::AssignedTo.is_null());
            }
            None => {}
        }
        if let Some(user_id) = assigned_to {
            query = query.filter(contact_request::Column::AssignedTo.eq(user_id));
        }

        let total = query.clone().count(&self.db).await.map_err(query_err)?;
        let items = query
            .order_by_desc(contact_request::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(query_err)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page { items, total })
    }

    async fn count(&self, status: Option<RequestStatus>) -> Result<u64, RepoError> {
        let mut query = ContactRequestEntity::find();
        if let Some(status) = status {
            query = query.filter(contact_request::Column::Status.eq(status.as_str()));
        }
        query.count(&self.db).await.map_err(query_err)
    }

    async fn count_unassigned(&self) -> Result<u64, RepoError> {
        ContactRequestEntity::find()
            .filter(contact_request::Column::AssignedTo.is_null())
            .filter(contact_request::Column::Status.ne(RequestStatus::Deleted.as_str()))
            .count(&self.db)
            .await
            .map_err(query_err)
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, RepoError> {
        let active: refresh_token::ActiveModel = token.into();
        let model = active.insert(&self.db).await.map_err(map_write_err)?;
        Ok(model.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, RepoError> {
        let result = RefreshTokenEntity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    async fn revoke(&self, id: Uuid) -> Result<(), RepoError> {
        let result = RefreshTokenEntity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(refresh_token::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let result = RefreshTokenEntity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.rows_affected)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = RefreshTokenEntity::delete_many()
            .filter(refresh_token::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl PasswordResetTokenRepository for PostgresPasswordResetTokenRepository {
    async fn save(&self, token: PasswordResetToken) -> Result<PasswordResetToken, RepoError> {
        let active: password_reset_token::ActiveModel = token.into();
        let model = active.insert(&self.db).await.map_err(map_write_err)?;
        Ok(model.into())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, RepoError> {
        let result = PasswordResetTokenEntity::find()
            .filter(password_reset_token::Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.map(Into::into))
    }

    async fn mark_used(&self, id: Uuid) -> Result<(), RepoError> {
        let result = PasswordResetTokenEntity::update_many()
            .col_expr(password_reset_token::Column::UsedAt, Expr::value(Utc::now()))
            .filter(password_reset_token::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = PasswordResetTokenEntity::delete_many()
            .filter(password_reset_token::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(query_err)?;
        Ok(result.rows_affected)
    }
}
