pub mod init;
pub mod partition;
pub mod route;
