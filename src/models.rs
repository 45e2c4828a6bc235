//! Response types for the mailing-list endpoints.

use serde::Deserialize;
use std::collections::HashMap;

/// A member of a mailing list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListMember {
    pub address: String,
    #[serde(default)]
    pub name: String,
    /// `false` once the member has unsubscribed but is still on the list.
    #[serde(default)]
    pub subscribed: bool,
    /// Custom data stored with the member.
    #[serde(default)]
    pub vars: HashMap<String, serde_json::Value>,
}

/// Envelope returned by `GET /lists/{list}/members/{address}`.
#[derive(Debug, Deserialize)]
pub(crate) struct MemberResponse {
    pub(crate) member: ListMember,
}
