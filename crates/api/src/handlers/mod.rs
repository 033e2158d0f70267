pub mod admin;
pub mod chatbot;
pub mod notification;
pub mod plan;
pub mod push;
pub mod reminders;
pub mod steps;
pub mod user;
