mod common;

mod admin;
mod auth;
mod competition;
mod cron;
mod karya;
mod referral;
mod webhook;
