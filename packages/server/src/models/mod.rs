pub mod admin;
pub mod auth;
pub mod competition;
pub mod event;
pub mod karya;
pub mod referral;
pub mod registration;
pub mod shared;
pub mod webhook;
