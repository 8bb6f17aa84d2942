//! Main application entry point.
//!
//! Parses the command line and dispatches to the display loop or to one of
//! the one-shot commands. All application logic lives in the library.

use anyhow::Result;

use minbar::{
    Minbar,
    args::{self, CliAction, ParsedArgs},
    commands, config,
    time::source::{self, TimeSource},
};

fn main() -> Result<()> {
    let parsed = ParsedArgs::from_env();

    match parsed.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp | CliAction::ShowHelpDueToError => {
            args::display_help();
            Ok(())
        }
        CliAction::Help { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            config_dir,
            demo,
            demo_interval,
        } => {
            config::set_config_dir(config_dir)?;
            let runner = Minbar::new(debug_enabled);
            if demo {
                runner.demo(demo_interval).run()
            } else {
                runner.run()
            }
        }
        CliAction::Times {
            debug_enabled,
            config_dir,
            date,
        } => {
            config::set_config_dir(config_dir)?;
            if let Err(e) = commands::times::handle_times_command(date.as_deref(), debug_enabled) {
                minbar::log_error_exit!("{:#}", e);
                commands::help::show_command_usage("times");
                std::process::exit(1);
            }
            Ok(())
        }
        CliAction::Simulate {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            log_to_file,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            let mut guards = match commands::simulate::handle_simulate_command(
                start_time,
                end_time,
                multiplier,
                debug_enabled,
                log_to_file,
            ) {
                Ok(guards) => guards,
                Err(e) => {
                    minbar::log_error_exit!("{:#}", e);
                    commands::help::show_command_usage("simulate");
                    std::process::exit(1);
                }
            };

            // Simulations never touch the lock of a real instance
            Minbar::new(debug_enabled)
                .without_lock()
                .without_headers()
                .run()?;

            if source::global().is_ended() {
                guards.complete_simulation();
            }
            Ok(())
        }
    }
}
