//! Command-line flags the daemon accepts. There are no subcommands: this is
//! a long-running process, not an interactive tool.

use std::time::Duration;

use clap::Parser;

/// A normalized view of a machine's power devices over the system bus.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity. Repeatable: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Exit after this many seconds of inactivity, for test harnesses.
    #[arg(long, value_name = "SECONDS")]
    pub timed_exit: Option<u64>,

    /// Exit right after the initial coldplug enumeration, for test harnesses.
    #[arg(long)]
    pub immediate_exit: bool,

    /// Take over the well-known bus name from an already-running instance.
    #[arg(long)]
    pub replace: bool,
}

impl Cli {
    /// The exit policy implied by `--timed-exit` / `--immediate-exit`.
    /// `--immediate-exit` wins if both are given.
    pub fn exit_policy(&self) -> upowerd_daemon::ExitPolicy {
        if self.immediate_exit {
            upowerd_daemon::ExitPolicy::Immediate
        } else if let Some(seconds) = self.timed_exit {
            upowerd_daemon::ExitPolicy::Timed(Duration::from_secs(seconds))
        } else {
            upowerd_daemon::ExitPolicy::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use upowerd_daemon::ExitPolicy;

    use super::*;

    fn cli(timed_exit: Option<u64>, immediate_exit: bool) -> Cli {
        Cli {
            verbose: 0,
            timed_exit,
            immediate_exit,
            replace: false,
        }
    }

    #[test]
    fn immediate_exit_wins_over_timed_exit() {
        assert_eq!(cli(Some(30), true).exit_policy(), ExitPolicy::Immediate);
    }

    #[test]
    fn timed_exit_maps_to_a_duration() {
        assert_eq!(cli(Some(30), false).exit_policy(), ExitPolicy::Timed(Duration::from_secs(30)));
    }

    #[test]
    fn no_flags_means_normal_exit_policy() {
        assert_eq!(cli(None, false).exit_policy(), ExitPolicy::Normal);
    }
}
