use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CreateAuditLog {
    pub admin_id: Uuid,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Auth
    Login,
    Logout,
    // Leads
    UpdateLead,
    DeleteLead,
    AddLeadNote,
    // Landing pages
    CreatePage,
    UpdatePage,
    DeletePage,
    // A/B tests
    CreateTest,
    UpdateTest,
    DeleteTest,
    // Webhooks
    CreateWebhook,
    UpdateWebhook,
    DeleteWebhook,
    TestWebhook,
    // GTM
    CreateGtmScript,
    UpdateGtmScript,
    DeleteGtmScript,
    // Admin management
    CreateAdmin,
    UpdateAdmin,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::UpdateLead => "update_lead",
            AuditAction::DeleteLead => "delete_lead",
            AuditAction::AddLeadNote => "add_lead_note",
            AuditAction::CreatePage => "create_page",
            AuditAction::UpdatePage => "update_page",
            AuditAction::DeletePage => "delete_page",
            AuditAction::CreateTest => "create_test",
            AuditAction::UpdateTest => "update_test",
            AuditAction::DeleteTest => "delete_test",
            AuditAction::CreateWebhook => "create_webhook",
            AuditAction::UpdateWebhook => "update_webhook",
            AuditAction::DeleteWebhook => "delete_webhook",
            AuditAction::TestWebhook => "test_webhook",
            AuditAction::CreateGtmScript => "create_gtm_script",
            AuditAction::UpdateGtmScript => "update_gtm_script",
            AuditAction::DeleteGtmScript => "delete_gtm_script",
            AuditAction::CreateAdmin => "create_admin",
            AuditAction::UpdateAdmin => "update_admin",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Admin,
    Session,
    Lead,
    Page,
    AbTest,
    Webhook,
    GtmScript,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Admin => "admin",
            ResourceType::Session => "session",
            ResourceType::Lead => "lead",
            ResourceType::Page => "page",
            ResourceType::AbTest => "ab_test",
            ResourceType::Webhook => "webhook",
            ResourceType::GtmScript => "gtm_script",
        }
    }
}
