//! CLI argument definitions

use clap::{Parser, ValueEnum};

/// Built-in workload to record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Direct hits plus a nested call chain, all on channel 0
    Nested,
    /// Jobs that capture their stack while preparing and are attributed to it
    /// when they run (channels 0 and 1)
    Jobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "hitstack",
    about = "Record call-stack hits for a sample workload and print the report",
    after_help = "\
EXAMPLES:
    hitstack                                 Nested-call workload, text report
    hitstack --scenario jobs --format json   Job attribution, JSON per channel
    HITSTACK_LINE_BACKEND=dwarf hitstack     Resolve lines in-process

ENVIRONMENT:
    HITSTACK_LINE_BACKEND   addr2line (default), dwarf or off
    HITSTACK_ADDR2LINE      addr2line program to run
    HITSTACK_BATCH_SIZE     addresses per addr2line call (default 100)
    HITSTACK_MAX_FRAMES     frames kept per stack (default 256)
    RUST_LOG                log filter, e.g. hitstack=debug"
)]
pub struct Args {
    /// Workload to run
    #[arg(short, long, value_enum, default_value = "nested")]
    pub scenario: Scenario,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// JSON indentation in spaces (0 = compact)
    #[arg(long, default_value = "2")]
    pub indent: usize,

    /// Show the raw native symbol of every frame (text format)
    #[arg(long)]
    pub symbols: bool,

    /// Number of job runs (jobs scenario)
    #[arg(long, default_value = "1000")]
    pub runs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["hitstack"]);
        assert_eq!(args.scenario, Scenario::Nested);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.indent, 2);
        assert!(!args.symbols);
        assert_eq!(args.runs, 1000);
    }

    #[test]
    fn test_jobs_json() {
        let args =
            Args::parse_from(["hitstack", "--scenario", "jobs", "-f", "json", "--indent", "0"]);
        assert_eq!(args.scenario, Scenario::Jobs);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.indent, 0);
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        assert!(Args::try_parse_from(["hitstack", "--scenario", "sampling"]).is_err());
    }
}
