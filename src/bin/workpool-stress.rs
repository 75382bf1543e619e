use clap::{crate_version, Clap};
use slog::*;
use std::process::exit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use workpool::error::Result;
use workpool::{QueueThreadPool, ThreadPool};

#[derive(Clap)]
#[clap(version = crate_version!())]
struct Options {
    #[clap(long, short, default_value = "4")]
    threads: usize,

    #[clap(long, short, default_value = "10000")]
    jobs: usize,
}

fn main() {
    let logger = logger();
    let options = Options::parse();

    if let Err(e) = run(&options, &logger) {
        error!(&logger, "{}", e);
        exit(1);
    }
}

fn run(options: &Options, logger: &Logger) -> Result<()> {
    info!(logger, "workpool stress";
        "version" => crate_version!(),
        "threads" => options.threads,
        "jobs" => options.jobs
    );

    let pool = QueueThreadPool::with_logger(options.threads, logger.clone())?;
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    for _ in 0..options.jobs {
        let done = Arc::clone(&done);
        pool.execute(move || {
            done.fetch_add(1, Ordering::SeqCst);
        })?;
    }
    pool.wait();

    info!(logger, "pool quiescent";
        "completed" => done.load(Ordering::SeqCst),
        "pending" => pool.waiting_jobs(),
        "elapsed_ms" => start.elapsed().as_millis() as u64
    );
    Ok(())
}

fn logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, o!())
}
