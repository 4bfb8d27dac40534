use serde::{Deserialize, Serialize};

/// User identity as seen by this service. Tokens are opaque credentials issued
/// by the external identity provider and matched verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
}
