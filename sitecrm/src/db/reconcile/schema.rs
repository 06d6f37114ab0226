//! The expected shape of the persisted catalog.
//!
//! Tables are listed in foreign-key dependency order: a table only references tables that appear
//! before it, so creating them in slice order never trips a missing-relation error.

use crate::api::models::pipeline::{AccountStatus, DealStage, LeadStatus, OpportunityStage, Pipeline, TaskStatus};

/// One expected column.
///
/// `not_null` only applies when the whole table is created. Columns added to an existing table
/// are always nullable so the `ALTER TABLE` cannot fail against rows that predate it; constant
/// defaults and foreign-key references are kept in both paths.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<&'static str>,
    pub references: Option<&'static str>,
}

impl ColumnSpec {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            not_null: false,
            default: None,
            references: None,
        }
    }

    const fn id() -> Self {
        let mut col = Self::new("id", "BIGSERIAL");
        col.primary_key = true;
        col
    }

    const fn required(mut self) -> Self {
        self.not_null = true;
        self
    }

    const fn default_to(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    const fn references(mut self, target: &'static str) -> Self {
        self.references = Some(target);
        self
    }

    /// Column definition used inside `CREATE TABLE`.
    pub fn create_definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        self.push_default_and_reference(&mut def);
        def
    }

    /// Column definition used by `ALTER TABLE ... ADD COLUMN`; never carries `NOT NULL`.
    pub fn add_definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.sql_type);
        self.push_default_and_reference(&mut def);
        def
    }

    fn push_default_and_reference(&self, def: &mut String) {
        if let Some(default) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if let Some(target) = self.references {
            def.push_str(" REFERENCES ");
            def.push_str(target);
        }
    }
}

/// One expected index. `predicate` makes it a partial index.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
    pub predicate: Option<&'static str>,
}

impl IndexSpec {
    const fn on(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: false,
            predicate: None,
        }
    }

    const fn unique(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: true,
            predicate: None,
        }
    }

    const fn unique_where(name: &'static str, columns: &'static [&'static str], predicate: &'static str) -> Self {
        Self {
            name,
            columns,
            unique: true,
            predicate: Some(predicate),
        }
    }

    pub fn create_statement(&self, table: &str) -> String {
        let mut sql = format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            table,
            self.columns.join(", ")
        );
        if let Some(predicate) = self.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }
}

/// A seed row: `(column, value)` pairs, all bound as text.
pub type SeedRow = &'static [(&'static str, &'static str)];

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub indexes: &'static [IndexSpec],
    /// Reference rows inserted on creation, and again whenever the table is found empty.
    pub seed: &'static [SeedRow],
    /// Whether the table carries the `workspace_id` scope column that gets backfilled.
    pub scoped: bool,
}

impl TableSpec {
    pub fn create_statement(&self) -> String {
        let columns = self.columns.iter().map(ColumnSpec::create_definition).collect::<Vec<_>>();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns.join(", "))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Column that partitions CRM rows into workspaces.
pub const SCOPE_COLUMN: &str = "workspace_id";

/// A fixed rewrite of legacy enumeration labels in one column.
#[derive(Debug, Clone, Copy)]
pub struct ValueRewrite {
    pub table: &'static str,
    pub column: &'static str,
    /// `(legacy, current)`; no `current` value may appear as a `legacy` value.
    pub mapping: &'static [(&'static str, &'static str)],
}

/// Deals used to share the opportunity pipeline's stage names.
pub const DEAL_STAGE_REWRITE: ValueRewrite = ValueRewrite {
    table: "deals",
    column: "stage",
    mapping: &[
        ("Leads", "Prospects"),
        ("Estimating", "Preparing proposal"),
        ("Submitted", "Proposal sent"),
        ("Won", "Closed Won"),
        ("Declined", "Lost"),
    ],
};

/// A column holding one of the pipeline vocabularies. Labels outside it, and NULLs in columns
/// added after the table was created, are rewritten to `fallback`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub table: &'static str,
    pub column: &'static str,
    pub labels: Vec<String>,
    pub fallback: String,
}

fn vocabulary<P: Pipeline>(table: &'static str, column: &'static str) -> Vocabulary {
    Vocabulary {
        table,
        column,
        labels: P::ALL.iter().map(ToString::to_string).collect(),
        fallback: P::INITIAL.to_string(),
    }
}

/// Every stage and status column, checked after the legacy rewrites have run.
pub fn vocabularies() -> Vec<Vocabulary> {
    vec![
        vocabulary::<AccountStatus>("accounts", "status"),
        vocabulary::<DealStage>("deals", "stage"),
        vocabulary::<LeadStatus>("leads", "status"),
        vocabulary::<OpportunityStage>("opportunities", "stage"),
        vocabulary::<TaskStatus>("tasks", "status"),
    ]
}

/// Columns that moved to `opportunities` and are dropped from `deals` when present.
pub const DEPRECATED_COLUMNS: &[(&str, &str)] = &[
    ("deals", "return_date"),
    ("deals", "quote_sent_date"),
    ("deals", "decision_date"),
    ("deals", "status_update_date"),
    ("deals", "location_lat"),
    ("deals", "location_lng"),
];

const fn owned_columns() -> [ColumnSpec; 6] {
    [
        ColumnSpec::new("workspace_id", "BIGINT").references("workspaces(id)"),
        ColumnSpec::new("owner_id", "BIGINT").references("users(id) ON DELETE SET NULL"),
        ColumnSpec::new("owner_name", "TEXT"),
        ColumnSpec::new("monday_item_id", "TEXT"),
        ColumnSpec::new("created_at", "TIMESTAMPTZ").required().default_to("NOW()"),
        ColumnSpec::new("updated_at", "TIMESTAMPTZ"),
    ]
}

const OWNED: [ColumnSpec; 6] = owned_columns();

const USERS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("email", "TEXT").required(),
    ColumnSpec::new("password_hash", "TEXT").required(),
    ColumnSpec::new("full_name", "TEXT"),
    ColumnSpec::new("role", "TEXT").required().default_to("'user'"),
    ColumnSpec::new("created_at", "TIMESTAMPTZ").required().default_to("NOW()"),
];

const WORKSPACES_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("description", "TEXT"),
    ColumnSpec::new("color", "TEXT"),
    ColumnSpec::new("monday_board_id", "TEXT"),
    ColumnSpec::new("is_active", "BOOLEAN").required().default_to("TRUE"),
    ColumnSpec::new("created_at", "TIMESTAMPTZ").required().default_to("NOW()"),
    ColumnSpec::new("updated_at", "TIMESTAMPTZ"),
];

const ACCOUNTS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("status", "TEXT").required().default_to("'Prospect'"),
    ColumnSpec::new("label", "TEXT"),
    ColumnSpec::new("industry", "TEXT"),
    ColumnSpec::new("employee_count", "TEXT"),
    ColumnSpec::new("website", "TEXT"),
    ColumnSpec::new("company_profile_url", "TEXT"),
    ColumnSpec::new("address", "TEXT"),
    ColumnSpec::new("notes", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const CONTACTS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("company", "TEXT"),
    ColumnSpec::new("account_id", "BIGINT").references("accounts(id) ON DELETE SET NULL"),
    ColumnSpec::new("contact_type", "TEXT"),
    ColumnSpec::new("job_title", "TEXT"),
    ColumnSpec::new("tier", "TEXT"),
    ColumnSpec::new("email", "TEXT"),
    ColumnSpec::new("phone", "TEXT"),
    ColumnSpec::new("linkedin_url", "TEXT"),
    ColumnSpec::new("location", "TEXT"),
    ColumnSpec::new("source", "TEXT"),
    ColumnSpec::new("icp_fit", "TEXT"),
    ColumnSpec::new("outreach_stage", "TEXT"),
    ColumnSpec::new("about", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const DEALS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("stage", "TEXT").required().default_to("'Prospects'"),
    ColumnSpec::new("status", "TEXT").default_to("'New deal'"),
    ColumnSpec::new("grade", "TEXT"),
    ColumnSpec::new("value", "NUMERIC(12, 2)"),
    ColumnSpec::new("deal_type", "TEXT"),
    ColumnSpec::new("deal_length", "INTEGER"),
    ColumnSpec::new("products", "TEXT[]").required().default_to("'{}'"),
    ColumnSpec::new("company_name", "TEXT"),
    ColumnSpec::new("contact_name", "TEXT"),
    ColumnSpec::new("email", "TEXT"),
    ColumnSpec::new("phone", "TEXT"),
    ColumnSpec::new("next_interaction", "DATE"),
    ColumnSpec::new("proposal_sent_date", "DATE"),
    ColumnSpec::new("close_date", "DATE"),
    ColumnSpec::new("close_probability", "INTEGER"),
    ColumnSpec::new("location_address", "TEXT"),
    ColumnSpec::new("link_url", "TEXT"),
    ColumnSpec::new("files", "TEXT[]").required().default_to("'{}'"),
    ColumnSpec::new("notes", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const LEADS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("status", "TEXT").required().default_to("'New Lead'"),
    ColumnSpec::new("priority", "TEXT"),
    ColumnSpec::new("source", "TEXT"),
    ColumnSpec::new("contact_name", "TEXT"),
    ColumnSpec::new("company_name", "TEXT"),
    ColumnSpec::new("job_title", "TEXT"),
    ColumnSpec::new("email", "TEXT"),
    ColumnSpec::new("phone", "TEXT"),
    ColumnSpec::new("next_interaction_date", "DATE"),
    ColumnSpec::new("qualified_date", "DATE"),
    ColumnSpec::new("notes", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const OPPORTUNITIES_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("stage", "TEXT").required().default_to("'Leads'"),
    ColumnSpec::new("grade", "TEXT"),
    ColumnSpec::new("contact_name", "TEXT"),
    ColumnSpec::new("company_name", "TEXT"),
    ColumnSpec::new("email", "TEXT"),
    ColumnSpec::new("phone", "TEXT"),
    ColumnSpec::new("sale_price", "NUMERIC(12, 2)"),
    ColumnSpec::new("close_probability", "INTEGER"),
    ColumnSpec::new("survey_required", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("quote_template", "TEXT"),
    ColumnSpec::new("next_interaction", "DATE"),
    ColumnSpec::new("return_date", "DATE"),
    ColumnSpec::new("quote_sent_date", "DATE"),
    ColumnSpec::new("decision_date", "DATE"),
    ColumnSpec::new("close_date", "DATE"),
    ColumnSpec::new("location_address", "TEXT"),
    ColumnSpec::new("link", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const TASKS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    ColumnSpec::new("name", "TEXT").required(),
    ColumnSpec::new("status", "TEXT").required().default_to("'To do'"),
    ColumnSpec::new("priority", "TEXT"),
    ColumnSpec::new("task_type", "TEXT"),
    ColumnSpec::new("due_date", "DATE"),
    ColumnSpec::new("close_date", "DATE"),
    ColumnSpec::new("related_to", "TEXT"),
    ColumnSpec::new("deal_id", "BIGINT").references("deals(id) ON DELETE SET NULL"),
    ColumnSpec::new("lead_id", "BIGINT").references("leads(id) ON DELETE SET NULL"),
    ColumnSpec::new("account_id", "BIGINT").references("accounts(id) ON DELETE SET NULL"),
    ColumnSpec::new("contact_id", "BIGINT").references("contacts(id) ON DELETE SET NULL"),
    ColumnSpec::new("notes", "TEXT"),
    OWNED[0],
    OWNED[1],
    OWNED[2],
    OWNED[3],
    OWNED[4],
    OWNED[5],
];

const CHECKLISTS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::id(),
    // Header
    ColumnSpec::new("site_name", "TEXT").required(),
    ColumnSpec::new("surveyor_name", "TEXT"),
    ColumnSpec::new("survey_date", "DATE"),
    ColumnSpec::new("site_address", "TEXT"),
    ColumnSpec::new("client_name", "TEXT"),
    ColumnSpec::new("client_contact", "TEXT"),
    ColumnSpec::new("project_name", "TEXT"),
    // Building
    ColumnSpec::new("building_level", "INTEGER"),
    ColumnSpec::new("ceiling_height", "NUMERIC(5, 2)"),
    ColumnSpec::new("skirting_size", "TEXT"),
    ColumnSpec::new("floor_type", "TEXT"),
    ColumnSpec::new("soffit_type", "TEXT"),
    ColumnSpec::new("existing_ceiling_trims", "TEXT"),
    ColumnSpec::new("ceiling_void_depth", "INTEGER"),
    ColumnSpec::new("floor_void_depth", "INTEGER"),
    // Access & logistics
    ColumnSpec::new("service_penetrations_scale", "INTEGER"),
    ColumnSpec::new("goods_lift_available", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("good_staircase_access", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("loading_bay_restrictions", "TEXT"),
    ColumnSpec::new("street_restrictions", "TEXT"),
    ColumnSpec::new("noise_restrictions", "TEXT"),
    // Finishes
    ColumnSpec::new("mullion_perimeter_details", "TEXT"),
    ColumnSpec::new("wall_deflection_needed", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("door_finish", "TEXT"),
    ColumnSpec::new("frame_type", "TEXT"),
    ColumnSpec::new("glazing_details", "TEXT"),
    ColumnSpec::new("head_track_detail", "TEXT"),
    // Project status
    ColumnSpec::new("start_date", "DATE"),
    ColumnSpec::new("project_secured", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("programme_available", "BOOLEAN").required().default_to("FALSE"),
    // Technical
    ColumnSpec::new("acoustic_baffles_required", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("fire_stopping_required", "BOOLEAN").required().default_to("FALSE"),
    ColumnSpec::new("mullion_details", "TEXT"),
    // Commercial & documentation
    ColumnSpec::new("pricing_details", "TEXT"),
    ColumnSpec::new("supplier_notes", "TEXT"),
    ColumnSpec::new("site_photos", "TEXT[]").required().default_to("'{}'"),
    ColumnSpec::new("additional_notes", "TEXT"),
    // Links
    ColumnSpec::new("deal_id", "BIGINT").references("deals(id) ON DELETE SET NULL"),
    ColumnSpec::new("workspace_id", "BIGINT").references("workspaces(id)"),
    ColumnSpec::new("user_id", "BIGINT").references("users(id) ON DELETE SET NULL"),
    ColumnSpec::new("monday_item_id", "TEXT"),
    ColumnSpec::new("westpark_item_id", "TEXT"),
    ColumnSpec::new("created_at", "TIMESTAMPTZ").required().default_to("NOW()"),
    ColumnSpec::new("updated_at", "TIMESTAMPTZ"),
];

const WORKSPACE_SEED: &[SeedRow] = &[
    &[
        ("name", "Satoris"),
        ("description", "Sales pipeline: deals, leads, accounts, contacts and tasks"),
        ("color", "#6366f1"),
    ],
    &[
        ("name", "Westpark"),
        ("description", "Site surveys and fit-out projects"),
        ("color", "#10b981"),
    ],
    &[
        ("name", "Business Technology Group"),
        ("description", "Opportunities and estimating"),
        ("color", "#f59e0b"),
    ],
];

/// Every table the service expects, in creation order.
pub static TABLES: &[TableSpec] = &[
    TableSpec {
        name: "users",
        columns: USERS_COLUMNS,
        indexes: &[IndexSpec::unique("users_email_key", &["email"])],
        seed: &[],
        scoped: false,
    },
    TableSpec {
        name: "workspaces",
        columns: WORKSPACES_COLUMNS,
        indexes: &[IndexSpec::unique("workspaces_name_key", &["name"])],
        seed: WORKSPACE_SEED,
        scoped: false,
    },
    TableSpec {
        name: "accounts",
        columns: ACCOUNTS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_accounts_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_accounts_owner_id", &["owner_id"]),
            IndexSpec::unique_where("accounts_monday_item_id_unique", &["monday_item_id"], "monday_item_id IS NOT NULL"),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "contacts",
        columns: CONTACTS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_contacts_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_contacts_owner_id", &["owner_id"]),
            IndexSpec::on("idx_contacts_account_id", &["account_id"]),
            IndexSpec::unique_where("contacts_monday_item_id_unique", &["monday_item_id"], "monday_item_id IS NOT NULL"),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "deals",
        columns: DEALS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_deals_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_deals_owner_id", &["owner_id"]),
            IndexSpec::on("idx_deals_stage", &["stage"]),
            IndexSpec::unique_where("deals_monday_item_id_unique", &["monday_item_id"], "monday_item_id IS NOT NULL"),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "leads",
        columns: LEADS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_leads_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_leads_owner_id", &["owner_id"]),
            IndexSpec::unique_where("leads_monday_item_id_unique", &["monday_item_id"], "monday_item_id IS NOT NULL"),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "opportunities",
        columns: OPPORTUNITIES_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_opportunities_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_opportunities_owner_id", &["owner_id"]),
            IndexSpec::on("idx_opportunities_stage", &["stage"]),
            IndexSpec::unique_where(
                "opportunities_monday_item_id_unique",
                &["monday_item_id"],
                "monday_item_id IS NOT NULL",
            ),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "tasks",
        columns: TASKS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_tasks_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_tasks_owner_id", &["owner_id"]),
            IndexSpec::on("idx_tasks_deal_id", &["deal_id"]),
            IndexSpec::unique_where("tasks_monday_item_id_unique", &["monday_item_id"], "monday_item_id IS NOT NULL"),
        ],
        seed: &[],
        scoped: true,
    },
    TableSpec {
        name: "checklists",
        columns: CHECKLISTS_COLUMNS,
        indexes: &[
            IndexSpec::on("idx_checklists_workspace_id", &["workspace_id"]),
            IndexSpec::on("idx_checklists_user_id", &["user_id"]),
            IndexSpec::on("idx_checklists_deal_id", &["deal_id"]),
            IndexSpec::unique_where(
                "checklists_monday_item_id_unique",
                &["monday_item_id"],
                "monday_item_id IS NOT NULL",
            ),
        ],
        seed: &[],
        scoped: true,
    },
];

pub fn table(name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|t| t.name == name)
}
