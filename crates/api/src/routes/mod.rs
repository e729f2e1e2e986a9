pub mod auth;
pub mod chat;
pub mod conversations;
pub mod doctors;
pub mod health;
pub mod models;
pub mod patients;
pub mod plasmas;
pub mod points;
pub mod reviews;
pub mod stats;
pub mod websocket;
