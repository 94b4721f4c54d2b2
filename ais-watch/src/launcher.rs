//! Start the external AIS decoder (aisdeco) that serves sentences over TCP.
//!
//! Started once and left alone: no supervision, no restart. If it dies
//! the socket closes and the stream loop ends.

use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use ais_core::config::DecoderConfig;

/// A running decoder child process.
pub struct DecoderProcess {
    child: Child,
}

impl DecoderProcess {
    /// Kill and reap the child. Errors are ignored; it may already be gone.
    pub fn stop(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        debug!("decoder process stopped");
    }
}

/// Build the decoder command line:
/// `<command> --freq <f>... [--freq-correction <ppm>] --net <port>`.
pub fn build_command(cfg: &DecoderConfig) -> Command {
    let mut cmd = Command::new(&cfg.command);
    for freq in &cfg.frequencies {
        cmd.arg("--freq").arg(freq.to_string());
    }
    if cfg.ppm_error != 0 {
        cmd.arg("--freq-correction").arg(cfg.ppm_error.to_string());
    }
    cmd.arg("--net").arg(cfg.port.to_string());
    cmd
}

/// Spawn the decoder with its output discarded, then give it time to open
/// its listening socket.
pub fn launch(cfg: &DecoderConfig) -> io::Result<DecoderProcess> {
    let child = build_command(cfg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!(command = %cfg.command, pid = child.id(), port = cfg.port, "decoder starting");

    thread::sleep(Duration::from_secs(cfg.startup_delay_secs));
    info!("decoder started");
    Ok(DecoderProcess { child })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ais_core::config::Config;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_command_defaults() {
        let cfg = Config::default().decoder;
        let cmd = build_command(&cfg);
        assert_eq!(cmd.get_program(), "aisdeco");
        assert_eq!(
            args(&cmd),
            vec!["--freq", "161975000", "--freq", "162025000", "--net", "1369"]
        );
    }

    #[test]
    fn test_build_command_ppm_error() {
        let mut cfg = Config::default().decoder;
        cfg.ppm_error = -3;
        cfg.port = 2000;
        let a = args(&build_command(&cfg));
        assert!(a.windows(2).any(|w| w == ["--freq-correction", "-3"]));
        assert_eq!(&a[a.len() - 2..], ["--net", "2000"]);
    }

    #[test]
    fn test_launch_missing_binary() {
        let mut cfg = Config::default().decoder;
        cfg.command = "/nonexistent/aisdeco".into();
        cfg.startup_delay_secs = 0;
        assert!(launch(&cfg).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_and_stop() {
        let mut cfg = Config::default().decoder;
        cfg.command = "true".into();
        cfg.startup_delay_secs = 0;
        let proc = launch(&cfg).unwrap();
        proc.stop();
    }
}
