//! # hitstack - Demo Entry Point
//!
//! Runs one of two small workloads against the process-wide registry and
//! prints the resulting report:
//! - **nested** (`--scenario nested`): repeated hits from a loop, a helper and
//!   a nested call chain, all on channel 0
//! - **jobs** (`--scenario jobs`): each job captures its stack while being
//!   prepared and is charged to it on channel 1 when it runs
//!
//! Workload functions are `#[inline(never)]` so each shows up as its own
//! frame.

use anyhow::{Context, Result};
use clap::Parser;
use hitstack::cli::{Args, OutputFormat, Scenario};
use hitstack::{Config, FramePointers, Registry};
use log::info;
use rand::Rng;
use std::io::{self, Write};

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    });
}

fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::try_from_env().context("Invalid HITSTACK_* environment")?;
    info!("Configuration: {config:?}");
    if hitstack::install(Registry::new(config)).is_err() {
        anyhow::bail!("hitstack registry was already initialized");
    }

    let channels: &[u8] = match args.scenario {
        Scenario::Nested => {
            nested::run();
            &[0]
        }
        Scenario::Jobs => {
            jobs::run(args.runs);
            &[0, 1]
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for &channel in channels {
        let rows = hitstack::dump(channel);
        match args.format {
            OutputFormat::Text => {
                writeln!(out, "Channel {channel}:")?;
                writeln!(out, "{}", hitstack::stack_frames_to_string(&rows, args.symbols))?;
            }
            OutputFormat::Json => {
                writeln!(out, "Channel {channel} JSON:")?;
                hitstack::write_json(&rows, args.indent, &mut out)
                    .context("Failed to write report")?;
                writeln!(out, "\n")?;
            }
        }
    }

    Ok(())
}

mod nested {
    use std::hint::black_box;

    // Every record call stays out of tail position and every loop keeps a
    // single call site, so release builds report the same stacks as debug.

    #[inline(never)]
    fn run_call() {
        hitstack::record(0u8);
        black_box(());
    }

    #[inline(never)]
    fn run_call2() {
        hitstack::record(0u8);
        run_call();
        hitstack::record(0u8);
        black_box(());
    }

    #[inline(never)]
    fn run_call3() {
        for _ in 0..black_box(20) {
            run_call2();
        }
    }

    /// 100 hits from the loop, 1 from `run_call`, 20 + 40 from the chain
    #[inline(never)]
    pub fn run() {
        for _ in 0..black_box(100) {
            hitstack::record(0u8);
        }
        run_call();
        run_call3();
    }
}

mod jobs {
    use super::{FramePointers, Rng};

    const JOB_COUNT: usize = 8;

    #[derive(Default)]
    struct Job {
        id: i64,
        origin: Option<FramePointers>,
        origin_score: i64,
    }

    impl Job {
        #[inline(never)]
        fn prepare(&mut self) {
            self.origin = hitstack::get_backtrace();
            self.origin_score = if self.origin.is_some() { -2 * self.id } else { 0 };
        }

        /// Roughly half the runs are attributed to the preparing stack
        #[inline(never)]
        fn run(&self, rng: &mut impl Rng) {
            let score: i64 = rng.gen_range(0..0xfffff);
            hitstack::record_with_score(0u8, score);
            if score > 0x7ffff {
                if let Some(origin) = &self.origin {
                    hitstack::record_stack(1u8, origin, self.origin_score);
                }
            }
        }
    }

    #[inline(never)]
    pub fn run(runs: usize) {
        let mut rng = rand::thread_rng();
        let mut jobs: Vec<Job> = (1..=JOB_COUNT)
            .map(|id| Job { id: i64::try_from(id).unwrap_or(i64::MAX), ..Job::default() })
            .collect();

        for _ in 0..runs {
            let job = &mut jobs[rng.gen_range(0..JOB_COUNT)];
            job.prepare();
            job.run(&mut rng);
        }
    }
}
