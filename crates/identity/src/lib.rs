//! Identity linking: external chat id → [`Principal`] → tenant id.
//!
//! Principals are written only by the out-of-band link callback (the OAuth
//! completion); everything else reads. Re-linking the same chat id is
//! last-write-wins.

mod directory;
mod linker;
mod store;

use serde::{Deserialize, Serialize};

pub use {
    directory::{HttpTenantDirectory, TenantDirectory},
    linker::{IdentityError, IdentityLinker, is_valid_tenant_id},
    store::{PrincipalStore, SqlitePrincipalStore},
};

/// An authenticated identity linked to an external chat id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub external_chat_id: String,
    pub provider_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}
