use anyhow::Context;
use clap::Parser;
use sqlbench::bench::{Filter, Harness, WorkloadKind};
use sqlbench::config::BenchConfig;
use sqlbench::database::BackendKind;
use sqlbench::fixtures::FixtureStore;
use sqlbench::logging::{init_logging, LogConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sqlbench", version, about = "Benchmark database access strategies")]
struct Options {
    /// Configuration file (defaults to ./sqlbench.toml when present)
    #[arg(long, short = 'c', env = "SQLBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Backend to run: postgres, sqlite or sqlmock (repeatable; default all)
    #[arg(long = "backend", short = 'b')]
    backends: Vec<BackendKind>,

    /// Workload to run: select, insert, insert-prepared, update, update-prepared
    #[arg(long = "workload", short = 'w')]
    workloads: Vec<WorkloadKind>,

    /// Only these row counts, e.g. `--rows 5,100`
    #[arg(long, value_delimiter = ',')]
    rows: Vec<usize>,

    /// Target running time per unit
    #[arg(long)]
    bench_time_ms: Option<u64>,

    /// Log level, overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let options = Options::parse();

    let mut config =
        BenchConfig::load(options.config.as_deref()).context("failed to load configuration")?;
    if let Some(bench_time_ms) = options.bench_time_ms {
        config.bench_time_ms = bench_time_ms;
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone();
    }

    let _guard = init_logging(&LogConfig::from_bench_config(&config))?;

    let fixtures = FixtureStore::embedded().context("failed to decode embedded fixtures")?;

    let harness = Harness::new(config, fixtures).with_filter(Filter {
        backends: options.backends,
        workloads: options.workloads,
        rows: options.rows,
    });

    let mut failed = false;
    for report in harness.run().await {
        println!("{}", report);
        failed |= report.failed();
    }

    if failed {
        anyhow::bail!("one or more benchmark units failed");
    }
    Ok(())
}
