pub mod api;
pub mod topic;

pub use topic::{ new_record_id, Message, Paper, Role, Topic, TopicSummary };
