pub mod args;
pub mod poll;
pub mod recordings;

pub use args::{Cli, CliCommand};
pub use poll::handle_poll_command;
pub use recordings::{
    handle_delete_command, handle_embed_command, handle_list_command, handle_rename_command,
    handle_upload_command,
};
