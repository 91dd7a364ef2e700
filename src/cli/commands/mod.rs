mod init;
mod tags;
mod users;

pub use init::cmd_init;
pub use tags::cmd_list_tags;
pub use users::{cmd_create_user, cmd_list_users, cmd_resend_activation};
