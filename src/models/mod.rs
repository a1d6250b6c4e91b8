pub mod activity;
pub mod commission;
pub mod report;
pub mod user;
pub mod wallet;
