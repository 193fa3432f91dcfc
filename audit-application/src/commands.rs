pub mod audit_commands;
pub mod threshold_commands;
