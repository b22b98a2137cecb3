mod api_key_store_mysql;
mod principal_repo_mysql;

pub use api_key_store_mysql::*;
pub use principal_repo_mysql::*;

mod util;
