pub mod board;
pub mod session;
pub mod username;
pub mod validator;
