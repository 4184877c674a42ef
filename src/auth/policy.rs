//! Authorization decisions, separated from HTTP plumbing.
//!
//! Each function takes the caller identity and the resource and answers
//! allow/deny. The same-user rule backs the profile and mailbox routes;
//! the two message rules are applied inline in the message handlers.

use crate::db::models::MessageDetail;

/// The caller must be exactly the user named in the request path.
pub fn same_user(caller: &str, target: &str) -> bool {
    caller == target
}

/// A message may be viewed in full only by its sender or its recipient.
pub fn may_view_message(caller: &str, message: &MessageDetail) -> bool {
    message.from_user.username == caller || message.to_user.username == caller
}

/// Only the recipient may mark a message read.
pub fn may_mark_read(caller: &str, message: &MessageDetail) -> bool {
    message.to_user.username == caller
}
