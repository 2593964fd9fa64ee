pub mod admin;
pub mod auth;
pub mod competition;
pub mod cron;
pub mod event;
pub mod health;
pub mod karya;
pub mod referral;
pub mod registration;
pub mod webhook;
