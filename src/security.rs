mod api_ext;
mod credentials;
mod jwt;

pub use self::{api_ext::SecurityApiExt, credentials::Credentials, jwt::Claims};
