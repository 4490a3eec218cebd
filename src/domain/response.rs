use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub message_id: String,
    pub template_id: String,
    pub scheduled_time: DateTime<Utc>,
}
