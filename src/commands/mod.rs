pub mod activity_cmd;
pub mod commission_config_cmd;
pub mod report_cmd;
pub mod system_cmd;
pub mod trigger_cmd;
pub mod user_cmd;
pub mod wallet_cmd;
