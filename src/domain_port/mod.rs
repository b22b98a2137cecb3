// store

mod api_key_store;
mod session_store;

pub use api_key_store::*;
pub use session_store::*;

// repo

mod principal_repo;

pub use principal_repo::*;
