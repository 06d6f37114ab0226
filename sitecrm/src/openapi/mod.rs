//! OpenAPI documentation for the CRM API.
//!
//! The rendered document is served by Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Registers the `BearerAuth` scheme referenced by every protected path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token returned by `/auth/login` or `/auth/register`:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "SiteCRM API", description = "Deals, leads, accounts, contacts, tasks, opportunities and site surveys."),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::healthz,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::me,
        api::handlers::workspaces::list_workspaces,
        api::handlers::workspaces::get_workspace,
        api::handlers::workspaces::create_workspace,
        api::handlers::workspaces::update_workspace,
        api::handlers::workspaces::delete_workspace,
        api::handlers::deals::list_deals,
        api::handlers::deals::get_deal,
        api::handlers::deals::create_deal,
        api::handlers::deals::update_deal,
        api::handlers::deals::delete_deal,
        api::handlers::leads::list_leads,
        api::handlers::leads::get_lead,
        api::handlers::leads::create_lead,
        api::handlers::leads::update_lead,
        api::handlers::leads::delete_lead,
        api::handlers::accounts::list_accounts,
        api::handlers::accounts::get_account,
        api::handlers::accounts::create_account,
        api::handlers::accounts::update_account,
        api::handlers::accounts::delete_account,
        api::handlers::contacts::list_contacts,
        api::handlers::contacts::get_contact,
        api::handlers::contacts::create_contact,
        api::handlers::contacts::update_contact,
        api::handlers::contacts::delete_contact,
        api::handlers::tasks::list_tasks,
        api::handlers::tasks::get_task,
        api::handlers::tasks::create_task,
        api::handlers::tasks::update_task,
        api::handlers::tasks::delete_task,
        api::handlers::opportunities::list_opportunities,
        api::handlers::opportunities::get_opportunity,
        api::handlers::opportunities::create_opportunity,
        api::handlers::opportunities::update_opportunity,
        api::handlers::opportunities::delete_opportunity,
        api::handlers::checklists::list_checklists,
        api::handlers::checklists::get_checklist,
        api::handlers::checklists::create_checklist,
        api::handlers::checklists::update_checklist,
        api::handlers::checklists::delete_checklist,
        api::handlers::checklists::upload_photo,
        api::handlers::checklists::sync_checklist,
        api::handlers::admin::list_users,
        api::handlers::admin::list_all_checklists,
        api::handlers::chat::chat,
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::TokenResponse,
            api::models::users::Role,
            api::models::users::UserResponse,
            api::models::users::UserWithChecklistCount,
            api::models::pipeline::DealStage,
            api::models::pipeline::LeadStatus,
            api::models::pipeline::AccountStatus,
            api::models::pipeline::TaskStatus,
            api::models::pipeline::OpportunityStage,
            api::models::workspaces::WorkspaceCreate,
            api::models::workspaces::WorkspaceUpdate,
            api::models::workspaces::WorkspaceResponse,
            api::models::deals::DealCreate,
            api::models::deals::DealUpdate,
            api::models::deals::DealResponse,
            api::models::leads::LeadCreate,
            api::models::leads::LeadUpdate,
            api::models::leads::LeadResponse,
            api::models::accounts::AccountCreate,
            api::models::accounts::AccountUpdate,
            api::models::accounts::AccountResponse,
            api::models::contacts::ContactCreate,
            api::models::contacts::ContactUpdate,
            api::models::contacts::ContactResponse,
            api::models::tasks::TaskCreate,
            api::models::tasks::TaskUpdate,
            api::models::tasks::TaskResponse,
            api::models::opportunities::OpportunityCreate,
            api::models::opportunities::OpportunityUpdate,
            api::models::opportunities::OpportunityResponse,
            api::models::checklists::ChecklistCreate,
            api::models::checklists::ChecklistUpdate,
            api::models::checklists::ChecklistResponse,
            api::models::checklists::ChecklistSyncResponse,
            api::models::chat::ChatRole,
            api::models::chat::ChatMessage,
            api::models::chat::ChatRequest,
            api::models::chat::ChatResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness check."),
        (name = "auth", description = "Registration, login and the current session."),
        (name = "workspaces", description = "Workspaces scope every CRM record. Changes are admin only."),
        (name = "deals", description = "Deals moving through the sales pipeline. Linked to Monday.com items by `monday_item_id`."),
        (name = "leads", description = "Inbound leads. A lead that left Prospect cannot return to it."),
        (name = "accounts", description = "Customer accounts."),
        (name = "contacts", description = "People at customer accounts."),
        (name = "tasks", description = "Follow-up work attached to deals."),
        (name = "opportunities", description = "Opportunities with pricing and close probability. Won is final."),
        (name = "checklists", description = "Site survey checklists, their photos and their Monday.com sync."),
        (name = "admin", description = "Cross-user views for administrators."),
        (name = "chat", description = "Pipeline assistant grounded on the caller's visible deals and tasks."),
    )
)]
pub struct ApiDoc;
