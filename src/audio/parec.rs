//! PulseAudio capture through the `parec` client
//!
//! The record stream is opened by spawning `parec` in raw mode and reading
//! its stdout. Server and device selection map directly onto `parec`'s own
//! flags, so an empty value means "use the server's default".

use std::process::Stdio;

use tokio::process::{Child, ChildStdout, Command};

use crate::error::SourceError;

use super::source::{read_full, FrameSource};
use super::spec::SampleSpec;

/// Client name reported to the audio server
pub const CLIENT_NAME: &str = "pcm-relay";

/// Executable used for capture
pub const PAREC_BIN: &str = "parec";

/// Record stream backed by a `parec` child process
pub struct ParecSource {
    child: Child,
    stdout: ChildStdout,
}

impl ParecSource {
    /// Start recording from `device` on `server`
    pub fn connect(
        server: &str,
        device: &str,
        spec: &SampleSpec,
        buffer_ms: u32,
    ) -> Result<Self, SourceError> {
        Self::connect_with(PAREC_BIN, server, device, spec, buffer_ms)
    }

    /// Same as [`connect`](Self::connect) with an explicit executable path
    pub fn connect_with(
        program: &str,
        server: &str,
        device: &str,
        spec: &SampleSpec,
        buffer_ms: u32,
    ) -> Result<Self, SourceError> {
        let args = parec_args(server, device, spec, buffer_ms);

        tracing::debug!(program = program, args = ?args, "Starting capture process");

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(SourceError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SourceError::Spawn(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "capture process has no stdout",
            ))
        })?;

        let server_name = if server.is_empty() { "default" } else { server };
        let device_name = if device.is_empty() { "default" } else { device };

        tracing::info!(
            server = server_name,
            device = device_name,
            spec = %spec,
            "Capture stream opened"
        );

        Ok(Self { child, stdout })
    }
}

impl FrameSource for ParecSource {
    async fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        read_full(&mut self.stdout, buf).await
    }

    async fn release(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "Capture process already gone");
        }
    }
}

/// Build the `parec` argument list
fn parec_args(server: &str, device: &str, spec: &SampleSpec, buffer_ms: u32) -> Vec<String> {
    let mut args = vec![
        "--raw".to_string(),
        format!("--format={}", spec.format.as_str()),
        format!("--rate={}", spec.rate),
        format!("--channels={}", spec.channels),
        format!("--latency-msec={}", buffer_ms.max(1)),
        format!("--client-name={}", CLIENT_NAME),
    ];

    if !server.is_empty() {
        args.push(format!("--server={}", server));
    }
    if !device.is_empty() {
        args.push(format!("--device={}", device));
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = parec_args("", "", &SampleSpec::default(), 50);

        assert_eq!(
            args,
            vec![
                "--raw",
                "--format=s16le",
                "--rate=44100",
                "--channels=2",
                "--latency-msec=50",
                "--client-name=pcm-relay",
            ]
        );
    }

    #[test]
    fn test_args_server_and_device() {
        let spec = SampleSpec::s16le(48_000, 1);
        let args = parec_args("tcp:studio:4713", "alsa_input.usb", &spec, 20);

        assert!(args.contains(&"--server=tcp:studio:4713".to_string()));
        assert!(args.contains(&"--device=alsa_input.usb".to_string()));
        assert!(args.contains(&"--channels=1".to_string()));
    }

    #[test]
    fn test_latency_floor() {
        let args = parec_args("", "", &SampleSpec::default(), 0);
        assert!(args.contains(&"--latency-msec=1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_connect() {
        let result = ParecSource::connect_with(
            "/nonexistent/pcm-relay-parec",
            "",
            "",
            &SampleSpec::default(),
            50,
        );
        assert!(matches!(result, Err(SourceError::Spawn(_))));
    }
}
