//! Command-line argument parsing and processing.
//!
//! Supports the long-running display (`minbar [OPTIONS]`) and the one-shot
//! subcommands `times`, `simulate` and `help`. Unknown options never abort
//! parsing; they turn the action into [`CliAction::ShowHelpDueToError`].

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the display loop
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        demo: bool,
        /// Auto-advance period overriding `demo_interval` from the config
        demo_interval: Option<u64>,
    },
    /// Print the schedule for a day and exit
    Times {
        debug_enabled: bool,
        config_dir: Option<String>,
        date: Option<String>,
    },
    /// Run the display loop on an accelerated clock
    Simulate {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        /// 0.0 selects fast-forward
        multiplier: f64,
        log_to_file: bool,
        config_dir: Option<String>,
    },
    /// Detailed help for a command
    Help { command: Option<String> },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

/// Default simulation speed: one simulated minute per real second.
const DEFAULT_SIMULATION_MULTIPLIER: f64 = 60.0;

/// Loose `YYYY-MM-DD HH:MM:SS` shape check; the simulate command parses fully.
fn looks_like_datetime(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 19
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b' '
        && bytes[13] == b':'
        && bytes[16] == b':'
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first element of `args` is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let action = Self::parse_action(&args_vec);
        ParsedArgs { action }
    }

    fn parse_action(args: &[String]) -> CliAction {
        if args.iter().any(|a| a == "--version" || a == "-V" || a == "-v") {
            return CliAction::ShowVersion;
        }

        let mut debug_enabled = false;
        let mut config_dir: Option<String> = None;
        let mut demo = false;
        let mut demo_interval: Option<u64> = None;
        let mut display_help = false;
        let mut unknown_arg_found = false;
        let mut positionals: Vec<String> = Vec::new();
        let mut log_to_file = false;
        let mut fast_forward = false;

        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--help" | "-h" => display_help = true,
                "--debug" | "-d" => debug_enabled = true,
                "--log" => log_to_file = true,
                "--fast-forward" => fast_forward = true,
                "--config" | "-c" => {
                    if i + 1 < args.len() && !args[i + 1].starts_with('-') {
                        config_dir = Some(args[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                "--demo" | "-D" => {
                    demo = true;
                    // Optional auto-advance seconds
                    if let Some(next) = args.get(i + 1)
                        && let Ok(secs) = next.parse::<u64>()
                    {
                        demo_interval = Some(secs);
                        i += 1;
                    }
                }
                _ if arg.starts_with('-') => {
                    log_warning!("Unknown option: {arg}");
                    unknown_arg_found = true;
                }
                _ => positionals.push(arg.to_string()),
            }
            i += 1;
        }

        if unknown_arg_found {
            return CliAction::ShowHelpDueToError;
        }

        let Some((command, rest)) = positionals.split_first() else {
            if display_help {
                return CliAction::ShowHelp;
            }
            return CliAction::Run {
                debug_enabled,
                config_dir,
                demo,
                demo_interval,
            };
        };

        match command.as_str() {
            "help" | "h" => CliAction::Help {
                command: rest.first().cloned(),
            },
            _ if display_help => CliAction::Help {
                command: Some(command.clone()),
            },
            "times" | "t" => match rest {
                [] => CliAction::Times {
                    debug_enabled,
                    config_dir,
                    date: None,
                },
                [date] => CliAction::Times {
                    debug_enabled,
                    config_dir,
                    date: Some(date.clone()),
                },
                _ => {
                    log_warning!("Too many arguments. Usage: minbar times [YYYY-MM-DD]");
                    CliAction::ShowHelpDueToError
                }
            },
            "simulate" | "S" => {
                let (start_time, end_time, multiplier) = match rest {
                    [start, end] => (start, end, None),
                    [start, end, multiplier] => (start, end, Some(multiplier)),
                    _ => {
                        log_warning!(
                            "Usage: minbar simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier | --fast-forward] [--log]"
                        );
                        return CliAction::ShowHelpDueToError;
                    }
                };

                for value in [start_time, end_time] {
                    if !looks_like_datetime(value) {
                        log_error!("Invalid time format: '{}'. Use YYYY-MM-DD HH:MM:SS", value);
                        return CliAction::ShowHelpDueToError;
                    }
                }

                let multiplier = match (multiplier, fast_forward) {
                    (Some(_), true) => {
                        log_error!("Use either a multiplier or --fast-forward, not both");
                        return CliAction::ShowHelpDueToError;
                    }
                    (None, true) => 0.0,
                    (None, false) => DEFAULT_SIMULATION_MULTIPLIER,
                    (Some(value), false) => match value.parse::<f64>() {
                        Ok(mult) if (0.1..=3600.0).contains(&mult) => mult,
                        _ => {
                            log_error!(
                                "Invalid multiplier: {}. Must be between 0.1 and 3600.",
                                value
                            );
                            return CliAction::ShowHelpDueToError;
                        }
                    },
                };

                CliAction::Simulate {
                    debug_enabled,
                    start_time: start_time.clone(),
                    end_time: end_time.clone(),
                    multiplier,
                    log_to_file,
                    config_dir,
                }
            }
            unknown => {
                log_warning!("Unknown command: {}", unknown);
                CliAction::ShowHelpDueToError
            }
        }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("minbar [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-D, --demo [secs]      Step through every screen of every prayer");
    log_indented!("                       Advances every <secs> seconds and on SIGUSR1");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("times, t [date]        Print prayer and congregation times for a day");
    log_indented!("simulate, S <start> <end> [mult]  Run on an accelerated clock");
    log_indented!("help, h [COMMAND]      Show detailed help for a command");
    log_block_start!("Signals:");
    log_indented!("SIGUSR1                Advance the demo sequence");
    log_indented!("SIGUSR2                Reload the configuration");
    log_end!();
}
