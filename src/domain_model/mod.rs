mod api_key;
mod key;
mod principal;
mod session;
mod token;

pub use api_key::*;
pub use key::*;
pub use principal::*;
pub use session::*;
pub use token::*;
