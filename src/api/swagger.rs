use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Assignmate API",
        version = "1.0.0",
        description = "Backend for the Assignmate homework tracker. \n\n**Authentication:** every endpoint except register, login, health and metrics requires a JWT Bearer token.\n\n**Features:**\n- Email/password accounts\n- Assignment CRUD with derived overdue status\n- Dashboard and calendar views\n- Live updates over server-sent events\n- Admin user management and statistics",
        contact(
            name = "Assignmate Team"
        )
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_me,
        crate::api::auth::logout,
        crate::api::auth::update_profile,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Assignments
        crate::api::assignments::list_assignments,
        crate::api::assignments::create_assignment,
        crate::api::assignments::get_assignment,
        crate::api::assignments::update_assignment,
        crate::api::assignments::update_status,
        crate::api::assignments::complete_assignment,
        crate::api::assignments::delete_assignment,
        crate::api::assignments::assignment_stream,

        // Dashboard & Calendar
        crate::api::dashboard::get_dashboard,
        crate::api::calendar::get_day,
        crate::api::calendar::get_month,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::set_admin,
        crate::api::admin::toggle_admin,
        crate::api::admin::delete_user,
        crate::api::admin::get_stats,
        crate::api::admin::admin_stream,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::UpdateProfileRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserResponse,

            // Assignments
            crate::models::Priority,
            crate::models::AssignmentStatus,
            crate::models::CreateAssignmentRequest,
            crate::models::UpdateAssignmentRequest,
            crate::models::UpdateStatusRequest,
            crate::models::AssignmentResponse,

            // Stats
            crate::models::DashboardStats,
            crate::models::CalendarDay,
            crate::models::AppStats,
            crate::models::AdminUserResponse,
            crate::api::admin::SetAdminRequest,

            // Health
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, sign-in and session"),
        (name = "Assignments", description = "Homework CRUD and live stream"),
        (name = "Dashboard", description = "Per-user counters"),
        (name = "Calendar", description = "Assignments by day and month"),
        (name = "Admin", description = "User management and app statistics (admin only)"),
        (name = "Health", description = "Health check and metrics")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}
