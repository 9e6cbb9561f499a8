use chrono::Utc;
use uuid::Uuid;

/// `TCK-<unix millis>-<6 upper-case hex>`. Uniqueness is best effort here and
/// enforced by the store.
pub fn generate_tracking_id() -> String {
    format_tracking_id(Utc::now().timestamp_millis(), Uuid::new_v4())
}

fn format_tracking_id(millis: i64, entropy: Uuid) -> String {
    let bytes = entropy.as_bytes();
    format!("TCK-{}-{:02X}{:02X}{:02X}", millis, bytes[0], bytes[1], bytes[2])
}
