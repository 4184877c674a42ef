pub mod messages;
pub mod models;
pub mod users;

pub use messages::MessageRepository;
pub use models::{
    Message, MessageDetail, NewUser, ReadReceipt, ReceivedMessage, SentMessage, User, UserProfile,
    UserSummary,
};
pub use users::UserRepository;
