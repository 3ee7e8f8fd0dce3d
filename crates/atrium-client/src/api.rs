//! Typed API operations for the business-administration surface:
//! customers, contact requests, appointments, projects, users, roles,
//! and the dashboard aggregate.
//!
//! Every call attaches the current access token and decodes the
//! standard envelope; auth lifecycle concerns live in
//! [`crate::session`].

use uuid::Uuid;

use atrium_shared::dto::{
    AddNoteRequest, AppointmentDto, AppointmentQuery, AppointmentStats, AssignRequest,
    CancelAppointmentRequest, ContactRequestDto, ContactRequestQuery, ContactRequestStats,
    ConvertRequest, CreateAppointmentRequest, CreateContactRequest, CreateCustomerRequest,
    CreateProjectRequest, CustomerDto, CustomerNoteDto, CustomerStats, DashboardStats, PageQuery,
    Paged, ProjectDto, RoleDto, UpdateAppointmentRequest, UpdateContactRequest,
    UpdateCustomerRequest, UpdateProjectRequest, UserDto,
};

use crate::error::SessionError;
use crate::session::SessionManager;
use crate::transport::ApiRequest;

fn paged(mut request: ApiRequest, page: &PageQuery) -> ApiRequest {
    request = request
        .with_query("limit", page.limit)
        .with_query("offset", page.offset);
    if let Some(status) = &page.status {
        request = request.with_query("status", status);
    }
    request
}

impl SessionManager {
    // -- Customers ---------------------------------------------------------

    pub async fn customers(&self, query: &PageQuery) -> Result<Paged<CustomerDto>, SessionError> {
        let request = paged(ApiRequest::get("/api/customers"), query);
        self.inner.send(request).await
    }

    pub async fn customer(&self, id: Uuid) -> Result<CustomerDto, SessionError> {
        self.inner
            .send(ApiRequest::get(format!("/api/customers/{id}")))
            .await
    }

    pub async fn create_customer(
        &self,
        customer: &CreateCustomerRequest,
    ) -> Result<CustomerDto, SessionError> {
        self.inner
            .send(ApiRequest::post("/api/customers").with_json(customer))
            .await
    }

    pub async fn update_customer(
        &self,
        id: Uuid,
        update: &UpdateCustomerRequest,
    ) -> Result<CustomerDto, SessionError> {
        self.inner
            .send(ApiRequest::patch(format!("/api/customers/{id}")).with_json(update))
            .await
    }

    pub async fn add_customer_note(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<CustomerNoteDto, SessionError> {
        self.inner
            .send(
                ApiRequest::post(format!("/api/customers/{id}/notes")).with_json(&AddNoteRequest {
                    content: content.to_string(),
                }),
            )
            .await
    }

    pub async fn customer_stats(&self) -> Result<CustomerStats, SessionError> {
        self.inner.send(ApiRequest::get("/api/customers/stats")).await
    }

    // -- Contact requests --------------------------------------------------

    pub async fn contact_requests(
        &self,
        query: &ContactRequestQuery,
    ) -> Result<Paged<ContactRequestDto>, SessionError> {
        let mut request = ApiRequest::get("/api/requests")
            .with_query("limit", query.limit)
            .with_query("offset", query.offset);
        if let Some(status) = &query.status {
            request = request.with_query("status", status);
        }
        if let Some(assigned) = query.assigned {
            request = request.with_query("assigned", assigned);
        }
        if let Some(assigned_to) = query.assigned_to {
            request = request.with_query("assigned_to", assigned_to);
        }
        self.inner.send(request).await
    }

    pub async fn contact_request(&self, id: Uuid) -> Result<ContactRequestDto, SessionError> {
        self.inner
            .send(ApiRequest::get(format!("/api/requests/{id}")))
            .await
    }

    pub async fn create_contact_request(
        &self,
        request: &CreateContactRequest,
    ) -> Result<ContactRequestDto, SessionError> {
        self.inner
            .send(ApiRequest::post("/api/requests").with_json(request))
            .await
    }

    pub async fn update_contact_request(
        &self,
        id: Uuid,
        update: &UpdateContactRequest,
    ) -> Result<ContactRequestDto, SessionError> {
        self.inner
            .send(ApiRequest::patch(format!("/api/requests/{id}")).with_json(update))
            .await
    }

    pub async fn assign_contact_request(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<ContactRequestDto, SessionError> {
        self.inner
            .send(
                ApiRequest::post(format!("/api/requests/{id}/assign"))
                    .with_json(&AssignRequest { user_id }),
            )
            .await
    }

    /// Convert an inbound request into a scheduled appointment.
    pub async fn convert_contact_request(
        &self,
        id: Uuid,
        conversion: &ConvertRequest,
    ) -> Result<AppointmentDto, SessionError> {
        self.inner
            .send(ApiRequest::post(format!("/api/requests/{id}/convert")).with_json(conversion))
            .await
    }

    pub async fn contact_request_stats(&self) -> Result<ContactRequestStats, SessionError> {
        self.inner.send(ApiRequest::get("/api/requests/stats")).await
    }

    // -- Appointments ------------------------------------------------------

    pub async fn appointments(
        &self,
        query: &AppointmentQuery,
    ) -> Result<Paged<AppointmentDto>, SessionError> {
        let mut request = ApiRequest::get("/api/appointments")
            .with_query("limit", query.limit)
            .with_query("offset", query.offset);
        if let Some(status) = &query.status {
            request = request.with_query("status", status);
        }
        if let Some(upcoming) = query.upcoming {
            request = request.with_query("upcoming", upcoming);
        }
        self.inner.send(request).await
    }

    pub async fn appointment(&self, id: Uuid) -> Result<AppointmentDto, SessionError> {
        self.inner
            .send(ApiRequest::get(format!("/api/appointments/{id}")))
            .await
    }

    pub async fn create_appointment(
        &self,
        appointment: &CreateAppointmentRequest,
    ) -> Result<AppointmentDto, SessionError> {
        self.inner
            .send(ApiRequest::post("/api/appointments").with_json(appointment))
            .await
    }

    pub async fn update_appointment(
        &self,
        id: Uuid,
        update: &UpdateAppointmentRequest,
    ) -> Result<AppointmentDto, SessionError> {
        self.inner
            .send(ApiRequest::patch(format!("/api/appointments/{id}")).with_json(update))
            .await
    }

    pub async fn cancel_appointment(
        &self,
        id: Uuid,
        reason: &str,
    ) -> Result<AppointmentDto, SessionError> {
        self.inner
            .send(
                ApiRequest::post(format!("/api/appointments/{id}/cancel")).with_json(
                    &CancelAppointmentRequest {
                        reason: reason.to_string(),
                    },
                ),
            )
            .await
    }

    pub async fn appointment_stats(&self) -> Result<AppointmentStats, SessionError> {
        self.inner
            .send(ApiRequest::get("/api/appointments/stats"))
            .await
    }

    // -- Projects ----------------------------------------------------------

    pub async fn projects(&self, query: &PageQuery) -> Result<Paged<ProjectDto>, SessionError> {
        let request = paged(ApiRequest::get("/api/projects"), query);
        self.inner.send(request).await
    }

    pub async fn project(&self, id: Uuid) -> Result<ProjectDto, SessionError> {
        self.inner
            .send(ApiRequest::get(format!("/api/projects/{id}")))
            .await
    }

    pub async fn create_project(
        &self,
        project: &CreateProjectRequest,
    ) -> Result<ProjectDto, SessionError> {
        self.inner
            .send(ApiRequest::post("/api/projects").with_json(project))
            .await
    }

    pub async fn update_project(
        &self,
        id: Uuid,
        update: &UpdateProjectRequest,
    ) -> Result<ProjectDto, SessionError> {
        self.inner
            .send(ApiRequest::patch(format!("/api/projects/{id}")).with_json(update))
            .await
    }

    // -- Users, roles, dashboard -------------------------------------------

    pub async fn users(&self, active_only: bool) -> Result<Vec<UserDto>, SessionError> {
        self.inner
            .send(ApiRequest::get("/api/users").with_query("active_only", active_only))
            .await
    }

    pub async fn user(&self, id: Uuid) -> Result<UserDto, SessionError> {
        self.inner.send(ApiRequest::get(format!("/api/users/{id}"))).await
    }

    pub async fn roles(&self) -> Result<Vec<RoleDto>, SessionError> {
        self.inner.send(ApiRequest::get("/api/roles")).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, SessionError> {
        self.inner.send(ApiRequest::get("/api/dashboard/stats")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::SessionConfig;
    use crate::credentials::{TokenPair, TokenStore};
    use crate::transport::Verb;
    use crate::transport::testing::MockTransport;

    fn session() -> (SessionManager, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let manager = SessionManager::with_parts(
            SessionConfig::default(),
            transport.clone(),
            TokenStore::in_memory(),
        );
        (manager, transport)
    }

    #[tokio::test]
    async fn customer_listing_builds_query_and_attaches_bearer() {
        let (session, transport) = session();
        session.tokens().store(&TokenPair::new("acc", "ref")).await;
        transport.push_ok(
            200,
            serde_json::json!({
                "success": true,
                "data": { "items": [], "total": 0, "limit": 25, "offset": 50 }
            }),
        );

        let query = PageQuery {
            limit: 25,
            offset: 50,
            status: Some("active".to_string()),
        };
        let page = session.customers(&query).await.unwrap();
        assert_eq!(page.total, 0);

        let seen = transport.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.verb, Verb::Get);
        assert_eq!(request.path, "/api/customers");
        assert_eq!(request.bearer.as_deref(), Some("acc"));
        assert!(request.query.contains(&("limit".to_string(), "25".to_string())));
        assert!(request.query.contains(&("status".to_string(), "active".to_string())));
    }

    #[tokio::test]
    async fn assign_posts_the_user_id() {
        let (session, transport) = session();
        let request_id = Uuid::new_v4();
        let staff = Uuid::new_v4();
        transport.push_ok(
            200,
            serde_json::json!({
                "success": true,
                "data": {
                    "id": request_id,
                    "name": "Jo",
                    "email": "jo@example.com",
                    "subject": "Quote",
                    "body": "Call me",
                    "status": "in_progress",
                    "assigned_to": staff,
                    "created_at": "2026-01-05T10:00:00Z",
                    "updated_at": "2026-01-05T10:05:00Z"
                }
            }),
        );

        let updated = session
            .assign_contact_request(request_id, staff)
            .await
            .unwrap();
        assert_eq!(updated.assigned_to, Some(staff));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].path, format!("/api/requests/{request_id}/assign"));
        assert_eq!(
            seen[0].body.as_ref().unwrap()["user_id"],
            serde_json::json!(staff)
        );
    }
}
