pub mod auth;
pub mod connection;
pub mod sql_log;

pub use auth::{
    authenticate_with_retry, join_auth, AuthPhase, AuthReport, AuthState, AuthStates, Authenticate,
    RetryPolicy,
};
pub use connection::{classify_db_err, make_conn_spec, sanitize_db_url, ConnectionHandle};
pub use sql_log::SqlLogger;
