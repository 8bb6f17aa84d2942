//! Help command implementation for minbar.
//!
//! `minbar help [COMMAND]` shows general help or the detailed help of one
//! command.

use anyhow::Result;

/// Show brief usage for a command (used for error messages)
pub fn show_command_usage(command: &str) {
    match command {
        "times" | "t" => log_block_start!("Usage: minbar times [YYYY-MM-DD]"),
        "simulate" | "S" => log_block_start!(
            "Usage: minbar simulate <start> <end> [multiplier | --fast-forward] [--log]"
        ),
        _ => log_block_start!("Usage: minbar [OPTIONS] [COMMAND]"),
    }
}

/// Run the help command (dispatcher)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("help") | Some("h") => display_help_help(),
        Some("times") | Some("t") => super::times::display_help(),
        Some("simulate") | Some("S") => super::simulate::display_help(),
        Some(unknown) => {
            log_warning_standalone!("Unknown command: {}", unknown);
            display_general_help();
        }
    }
    Ok(())
}

fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("help, h [COMMAND]        Show detailed help for a command");
    log_indented!("simulate, S <start> <end> Run the display on an accelerated clock");
    log_indented!("times, t [date]          Print prayer and congregation times");
    log_pipe!();
    log_info!("Use 'minbar help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'minbar --help' to see all options and general usage.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: minbar help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_block_start!("Examples:");
    log_indented!("minbar help");
    log_indented!("minbar help times");
    log_end!();
}
