// ABOUTME: Identifier generation for records and public links
// ABOUTME: Internal ids are UUIDs; share ids are unguessable nanoid tokens

/// Length of public share tokens
pub const SHARE_ID_LENGTH: usize = 21;

/// Generate an internal record id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate an opaque public token for a proposal or change request link
pub fn generate_share_id() -> String {
    nanoid::nanoid!(SHARE_ID_LENGTH)
}
