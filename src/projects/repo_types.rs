use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Project row with its member ids aggregated in join order.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Project {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}
