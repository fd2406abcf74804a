mod id;

pub use id::{ActivityLogId, SessionId, UserId};
