// Command handlers, one module per subcommand

pub mod init;
pub mod install;
pub mod list;
pub mod version;
