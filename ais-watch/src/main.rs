//! ais-watch: alert on watched vessels in a live AIS feed.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ais_core::config::{self, Config};
use ais_core::{PayloadDecoder, TrackCollection, Watchlist};

mod launcher;
mod stream;
mod summary;

use stream::{StreamError, StreamLoop};

#[derive(Parser)]
#[command(
    name = "ais-watch",
    version,
    about = "AIS vessel watchlist alerts and KML track export"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the decoder, connect to its feed, and alert on watched vessels
    Watch {
        #[command(flatten)]
        watch: WatchlistArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Decoder TCP port on localhost [default: from config, 1369]
        #[arg(short, long)]
        port: Option<u16>,

        /// SDR frequency correction in ppm (run `rtl_test -p` to find it)
        #[arg(short, long, allow_negative_numbers = true)]
        error: Option<i32>,

        /// Decoder executable [default: from config, aisdeco]
        #[arg(long, env = "AIS_WATCH_DECODER")]
        decoder: Option<String>,

        /// Connect to an already running decoder instead of starting one
        #[arg(long)]
        no_launch: bool,
    },

    /// Run the pipeline over a file of captured sentences
    Decode {
        /// Sentence file, one per line (`-` for stdin)
        file: PathBuf,

        #[command(flatten)]
        watch: WatchlistArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the effective configuration
    Config {
        /// Write it to ~/.ais-watch/config.yaml
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct WatchlistArgs {
    /// MMSI(s) of vessels of interest
    #[arg(short, long, num_args = 1..)]
    mmsi: Vec<u32>,

    /// Name(s) of vessels of interest
    #[arg(short, long, num_args = 1..)]
    name: Vec<String>,

    /// File of newline-delimited MMSIs
    #[arg(long)]
    mmsi_file: Option<PathBuf>,

    /// File of newline-delimited vessel names
    #[arg(long)]
    name_file: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Record every position and write a KML track on exit
    #[arg(short, long)]
    kml: bool,

    /// Directory for the KML file [default: from config, .]
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print every decoded message, not just alerts
    #[arg(short, long)]
    verbose: bool,

    /// Print verbose messages as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let cfg = config::load_config();

    let result = match cli.command {
        Commands::Watch {
            watch,
            output,
            port,
            error,
            decoder,
            no_launch,
        } => {
            let mut cfg = cfg;
            if let Some(p) = port {
                cfg.decoder.port = p;
            }
            if let Some(e) = error {
                cfg.decoder.ppm_error = e;
            }
            if let Some(d) = decoder {
                cfg.decoder.command = d;
            }
            cmd_watch(&cfg, &watch, &output, no_launch)
        }
        Commands::Decode {
            file,
            watch,
            output,
        } => cmd_decode(&cfg, &file, &watch, &output),
        Commands::Config { save } => cmd_config(&cfg, save),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_watchlist(args: &WatchlistArgs) -> anyhow::Result<Watchlist> {
    let mut watchlist = Watchlist::new();
    for &mmsi in &args.mmsi {
        watchlist.add_mmsi(mmsi);
    }
    for name in &args.name {
        watchlist.add_name(name);
    }
    if let Some(path) = &args.mmsi_file {
        let n = watchlist.load_mmsi_file(path)?;
        info!(path = %path.display(), entries = n, "loaded MMSI file");
    }
    if let Some(path) = &args.name_file {
        let n = watchlist.load_name_file(path)?;
        info!(path = %path.display(), entries = n, "loaded name file");
    }
    Ok(watchlist)
}

fn export_dir(cfg: &Config, output: &OutputArgs) -> PathBuf {
    output
        .export_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.export.dir))
}

fn new_loop<W: io::Write>(
    watchlist: Watchlist,
    output: &OutputArgs,
    out: W,
) -> StreamLoop<PayloadDecoder, W> {
    let track = output.kml.then(|| TrackCollection::new(Utc::now()));
    StreamLoop::new(PayloadDecoder, watchlist, track, out)
        .verbose(output.verbose || output.json)
        .json(output.json)
}

/// Export (if recording) and print the run summary.
fn finish<W: io::Write>(stream_loop: &mut StreamLoop<PayloadDecoder, W>, dir: &Path) {
    if let Some(track) = stream_loop.track() {
        info!(state = ?stream_loop.state(), placemarks = track.len(), "exporting track");
    }
    match stream_loop.drain(dir) {
        Ok(Some(path)) => println!("KML written: {}", path.display()),
        Ok(None) => {}
        Err(e) => error!(error = %e, "KML export failed"),
    }
    let stats = stream_loop.stats();
    info!(
        records = stats.records,
        malformed = stats.framing_errors,
        decode_errors = stats.decode_errors,
        alerts = stats.alerts,
        "run finished"
    );
    eprintln!("{}", summary::stats_table(stats));
}

fn install_interrupt_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;
    Ok(stop)
}

/// Drain on every way a live run can end, and pick the exit status:
/// 0 after an interrupt, 1 after a connection failure of any kind.
fn conclude<W: io::Write>(
    stream_loop: &mut StreamLoop<PayloadDecoder, W>,
    result: Result<(), StreamError>,
    dir: &Path,
) -> u8 {
    let status = match &result {
        Ok(()) => {
            info!("interrupted");
            0
        }
        Err(e) => {
            error!("{e}");
            1
        }
    };
    finish(stream_loop, dir);
    status
}

fn cmd_watch(
    cfg: &Config,
    args: &WatchlistArgs,
    output: &OutputArgs,
    no_launch: bool,
) -> anyhow::Result<ExitCode> {
    let watchlist = build_watchlist(args)?.require_nonempty()?;
    println!("{}", summary::watchlist_table(&watchlist));
    println!("Press Ctrl-C to quit at any time.");

    let stop = install_interrupt_handler()?;
    let decoder = if no_launch {
        None
    } else {
        Some(
            launcher::launch(&cfg.decoder)
                .with_context(|| format!("failed to start decoder {:?}", cfg.decoder.command))?,
        )
    };

    let addr = format!("localhost:{}", cfg.decoder.port);
    let mut stream_loop = new_loop(watchlist, output, io::stdout());
    let result = stream::run_live(&mut stream_loop, &addr, &stop);
    let status = conclude(&mut stream_loop, result, &export_dir(cfg, output));

    if let Some(decoder) = decoder {
        decoder.stop();
    }
    Ok(ExitCode::from(status))
}

fn cmd_decode(
    cfg: &Config,
    file: &Path,
    args: &WatchlistArgs,
    output: &OutputArgs,
) -> anyhow::Result<ExitCode> {
    let watchlist = build_watchlist(args)?;
    if watchlist.is_empty() && !output.verbose && !output.json && !output.kml {
        bail!("nothing to do: give a watchlist, --verbose, --json, or --kml");
    }

    let reader: Box<dyn BufRead> = if file.to_str() == Some("-") {
        Box::new(io::stdin().lock())
    } else {
        let f = File::open(file).with_context(|| format!("cannot open {}", file.display()))?;
        Box::new(BufReader::new(f))
    };

    let mut stream_loop = new_loop(watchlist, output, io::stdout());
    let never = AtomicBool::new(false);
    let result = stream_loop.run(reader, &never);
    finish(&mut stream_loop, &export_dir(cfg, output));

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => Err(e).with_context(|| format!("reading {}", file.display())),
    }
}

fn cmd_config(cfg: &Config, save: bool) -> anyhow::Result<ExitCode> {
    print!("{}", config::serialize_config(cfg));
    if save {
        let path = config::save_config(cfg)?;
        eprintln!("Saved {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from([
            "ais-watch", "watch", "-m", "123456789", "987654321", "-n", "TESTSHIP", "-p", "2000",
            "-e", "-3", "-k", "--no-launch",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                watch,
                output,
                port,
                error,
                no_launch,
                ..
            } => {
                assert_eq!(watch.mmsi, vec![123456789, 987654321]);
                assert_eq!(watch.name, vec!["TESTSHIP"]);
                assert_eq!(port, Some(2000));
                assert_eq!(error, Some(-3));
                assert!(output.kml);
                assert!(no_launch);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_mmsi() {
        assert!(Cli::try_parse_from(["ais-watch", "watch", "-m", "abc"]).is_err());
    }

    #[test]
    fn test_build_watchlist_merges_sources() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "111\n222").unwrap();
        let args = WatchlistArgs {
            mmsi: vec![222, 333],
            name: vec!["SEA WOLF".into()],
            mmsi_file: Some(f.path().to_path_buf()),
            name_file: None,
        };
        let w = build_watchlist(&args).unwrap();
        assert_eq!(w.mmsis().into_iter().collect::<Vec<_>>(), vec![111, 222, 333]);
        assert!(w.contains_name("SEA WOLF"));
    }

    #[test]
    fn test_empty_watchlist_rejected() {
        let args = WatchlistArgs {
            mmsi: vec![],
            name: vec![],
            mmsi_file: None,
            name_file: None,
        };
        assert!(build_watchlist(&args).unwrap().require_nonempty().is_err());
    }

    #[test]
    fn test_export_dir_override() {
        let cfg = Config::default();
        let mut output = OutputArgs {
            kml: true,
            export_dir: None,
            verbose: false,
            json: false,
        };
        assert_eq!(export_dir(&cfg, &output), PathBuf::from("."));
        output.export_dir = Some(PathBuf::from("/tmp/tracks"));
        assert_eq!(export_dir(&cfg, &output), PathBuf::from("/tmp/tracks"));
    }

    fn kml_output() -> OutputArgs {
        OutputArgs {
            kml: true,
            export_dir: None,
            verbose: false,
            json: false,
        }
    }

    fn kml_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|x| x == "kml"))
            .collect()
    }

    #[test]
    fn test_conclude_interrupt_exports_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut lp = new_loop(Watchlist::new(), &kml_output(), Vec::new());
        lp.process_record(b"!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5C");

        assert_eq!(conclude(&mut lp, Ok(()), dir.path()), 0);
        let files = kml_files(dir.path());
        assert_eq!(files.len(), 1);
        let text = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(text.matches("<Placemark>").count(), 1);
    }

    #[test]
    fn test_conclude_disconnect_exports_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut lp = new_loop(Watchlist::new(), &kml_output(), Vec::new());
        lp.process_record(b"!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5C");

        assert_eq!(conclude(&mut lp, Err(StreamError::Disconnected), dir.path()), 1);
        assert_eq!(kml_files(dir.path()).len(), 1);
        assert_eq!(lp.state(), stream::LoopState::Stopped);
    }

    #[test]
    fn test_connect_failure_still_exports() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dir = tempfile::tempdir().unwrap();
        let mut lp = new_loop(Watchlist::new(), &kml_output(), Vec::new());
        let addr = format!("127.0.0.1:{port}");
        let result = stream::run_live(&mut lp, &addr, &AtomicBool::new(false));
        assert!(matches!(result, Err(StreamError::Connect { .. })));

        assert_eq!(conclude(&mut lp, result, dir.path()), 1);
        let files = kml_files(dir.path());
        assert_eq!(files.len(), 1);
        let text = std::fs::read_to_string(&files[0]).unwrap();
        assert!(text.contains("<Folder>"));
        assert!(!text.contains("<Placemark>"));
    }

    #[test]
    fn test_conclude_without_kml_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = kml_output();
        output.kml = false;
        let mut lp = new_loop(Watchlist::new(), &output, Vec::new());

        assert_eq!(conclude(&mut lp, Err(StreamError::Disconnected), dir.path()), 1);
        assert!(kml_files(dir.path()).is_empty());
    }
}
