mod call;
mod check;
mod compile;
mod edit;
mod new;
mod util;

pub(crate) use call::cmd_call;
pub(crate) use check::cmd_check;
pub(crate) use compile::cmd_compile;
pub(crate) use edit::{EditFlags, cmd_edit};
pub(crate) use new::cmd_new;

pub(crate) use util::require_store_path;
