//! One module per top-level subcommand.

pub mod audit_cmd;
pub mod backup;
pub mod card;
pub mod collection;
pub mod completions;
pub mod credential;
pub mod file;
pub mod init;
pub mod note;
pub mod passwd;
pub mod unlock;
