//! HTTP gateway: webhook verification and receipt, per-event lifecycle
//! (dedup → parse → dispatch → reply), and the identity-link callback.

mod dispatch;
mod routes;
mod server;
mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    server::{build_app, serve},
    state::{AppState, ReplySink},
};
