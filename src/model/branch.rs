use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub branch_id: u64,
    pub organization_id: u64,
    pub name: String,
    pub is_active: bool,
}
