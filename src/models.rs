use serde::Serialize;

pub type Time = crate::time_utils::Time;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id :            u32,
    pub name :          String,
    pub email :         String,
    #[serde(skip_serializing)]
    pub password_hash : String,
    pub created_at :    Time,
}

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub id :          u32,
    /// `None` for rows written before links had owners.
    pub user_id :     Option<u32>,
    pub name :        String,
    pub url :         String,
    pub description : Option<String>,
    pub created_at :  Option<Time>,
}

impl Link {
    pub fn added(&self) -> String {
        self.created_at
            .map(|t| t.date())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
