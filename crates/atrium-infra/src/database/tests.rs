#[cfg(test)]
mod tests {
    use crate::database::entity::{customer, user};
    use crate::database::postgres_repo::{PostgresCustomerRepository, PostgresUserRepository};
    use atrium_core::domain::{Customer, User};
    use atrium_core::ports::{BaseRepository, CustomerRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user_model(email: &str) -> user::Model {
        let now = chrono::Utc::now();
        user::Model {
            id: uuid::Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: "hash".to_owned(),
            display_name: "Staff Member".to_owned(),
            role_id: uuid::Uuid::new_v4(),
            status: "active".to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_user_by_id_maps_to_domain() {
        let model = user_model("staff@example.com");
        let user_id = model.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresUserRepository::new(db);

        let result: Option<User> = repo.find_by_id(user_id).await.unwrap();

        let user = result.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "staff@example.com");
        assert!(user.is_active());
    }

    #[tokio::test]
    async fn find_user_by_email() {
        let model = user_model("jo@example.com");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresUserRepository::new(db);

        let found = repo.find_by_email("jo@example.com").await.unwrap();
        assert_eq!(found.unwrap().email, "jo@example.com");
    }

    #[tokio::test]
    async fn customer_listing_maps_page() {
        let now = chrono::Utc::now();
        let model = customer::Model {
            id: uuid::Uuid::new_v4(),
            name: "Acme GmbH".to_owned(),
            email: "office@acme.example".to_owned(),
            phone: None,
            company: Some("Acme".to_owned()),
            status: "active".to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        };

        // First result feeds the count query, second the page query.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(1)]])
            .append_query_results([vec![model]])
            .into_connection();

        let repo = PostgresCustomerRepository::new(db);

        let page = repo.list(10, 0, None).await.unwrap();
        assert_eq!(page.total, 1);
        let customer: &Customer = &page.items[0];
        assert_eq!(customer.name, "Acme GmbH");
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut row = std::collections::BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }
}
