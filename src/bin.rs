use filekin::{
    build_cli_options, parse_config, random_key, Arbiter, FdfError, Matcher, ScanDriver, ScanListener, SilentListener,
    TextUserInterface, Totals,
};
use std::env;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, RwLock};
use std::time::Instant;

fn main() {
    std::process::exit(match run() {
        Ok(()) => 0,
        Err(err) => {
            writeln!(&mut std::io::stderr(), "Error: {err}").ok();
            1
        },
    });
}

fn run() -> Result<(), FdfError> {
    let opts = build_cli_options();
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());
    let args: Vec<String> = args.collect();

    if args.iter().any(|a| a == "--help") {
        print_usage(&program, &opts);
        return Ok(());
    }

    let mut config = parse_config(&opts, &args)?;

    let lock = Arc::new(RwLock::new(()));
    let sig_lock = Arc::clone(&lock);
    ctrlc::set_handler(move || {
        // Block until any in-flight mutation releases its read guard, then
        // hold the write side for the rest of the process's life so no
        // further mutation can start mid-termination (spec.md §5).
        let _write_guard = sig_lock.write().unwrap_or_else(|e| e.into_inner());
        eprintln!("\ninterrupted, finishing current file then stopping");
        std::process::exit(130);
    })
    .ok();

    let totals = Arc::new(Totals::new());
    let digest_key = random_key();
    let min_size = config.effective_min_size();
    let match_spec = config.match_spec.clone();

    // Fields moved out last: the rest of `config`'s reads are done above so
    // this partial move doesn't conflict with passing `&config` below.
    let exclude = std::mem::replace(&mut config.exclude, filekin::GlobRuleSet::new(true));
    let protect = Rc::new(std::mem::replace(&mut config.protect, filekin::GlobRuleSet::new(true)));
    let keep = Rc::new(std::mem::replace(&mut config.keep, filekin::GlobRuleSet::new(true)));

    let matcher = Matcher::new(match_spec, exclude, Rc::clone(&protect), digest_key, config.skip_header, config.skip_footer, min_size);
    let arbiter = Arbiter::new(Rc::clone(&protect), Rc::clone(&keep), config.timestamps);
    let mut driver = ScanDriver::new(matcher, arbiter, &config, Arc::clone(&totals), Arc::clone(&lock));

    let mut text_ui;
    let mut silent_ui;
    let listener: &mut dyn ScanListener = if config.quiet {
        silent_ui = SilentListener;
        &mut silent_ui
    } else {
        text_ui = TextUserInterface::new(config.verbose);
        &mut text_ui
    };

    if config.dry_run {
        listener.notice("dry run, no files will be changed");
    }

    let started = Instant::now();
    for input in &config.inputs {
        driver.run_input(input, config.recursive, listener)?;
    }
    listener.scan_over(&totals, started.elapsed());

    #[cfg(feature = "json")]
    if let Some(path) = &config.json_report {
        if let Some(report) = driver.take_report() {
            filekin::write_report(&report, path).map_err(FdfError::Io)?;
        }
    }

    Ok(())
}

fn print_usage(program: &str, opts: &getopts::Options) {
    println!(
        "Find and reconcile duplicate files (v{}).\n{}\n\n{}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_HOMEPAGE"),
        opts.usage(&(opts.short_usage(program) + " <files or directories>"))
    );
}
