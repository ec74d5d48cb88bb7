use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Dashboard feed entry. `user` is a display name, not a reference.
#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub user_name: String,
    pub status: String,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub kind: String,
    pub title: String,
    pub user_name: String,
    pub status: String,
    pub timestamp: Option<OffsetDateTime>,
}
