//! Dashboard aggregation.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use atrium_shared::ApiResponse;
use atrium_shared::dto::DashboardStats;

use crate::handlers::{appointments, customers, requests};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/dashboard/stats
pub async fn stats(_identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = DashboardStats {
        customers: customers::compute_stats(&state).await?,
        requests: requests::compute_stats(&state).await?,
        appointments: appointments::compute_stats(&state).await?,
        generated_at: Utc::now(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
