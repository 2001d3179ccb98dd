mod credentials;
mod user;
