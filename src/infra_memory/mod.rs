mod api_key_store_memory;
mod principal_repo_memory;
mod session_store_memory;

pub use api_key_store_memory::*;
pub use principal_repo_memory::*;
pub use session_store_memory::*;
