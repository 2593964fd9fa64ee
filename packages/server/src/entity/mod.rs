pub mod activate_token;
pub mod competition;
pub mod competition_registration;
pub mod event;
pub mod event_registration;
pub mod karya;
pub mod karya_vote;
pub mod phase_submission;
pub mod referral_code;
pub mod role;
pub mod role_permission;
pub mod team_member;
pub mod transaction_detail;
pub mod user;
