pub mod chat_entity;
pub mod chat_join_entity;
pub mod message_entity;
pub mod message_read_entity;
pub mod model;
pub mod relation_edge;
pub mod user_entity;
