use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reactord", about = "Event reactor demos over the native handler bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log every event through a global handler
    GlobalLogger {
        /// Delay before the scheduled task fires
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        #[command(flatten)]
        reactor: ReactorArgs,
    },

    /// Count down from N, one timer task per step
    Countdown {
        /// Starting value
        #[arg(long, default_value_t = 3)]
        from: u32,

        /// Delay between steps
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,

        #[command(flatten)]
        reactor: ReactorArgs,
    },
}

/// Reactor settings shared by every demo.
#[derive(Args)]
pub struct ReactorArgs {
    /// Maximum number of live native handles
    #[arg(long, default_value_t = 4096)]
    pub max_handles: usize,

    /// What to do when an event handler fails
    #[arg(long, value_enum, default_value_t = OnError::Stop)]
    pub on_error: OnError,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OnError {
    /// Stop the reactor and exit with an error
    Stop,
    /// Log the error and keep running
    Log,
}
