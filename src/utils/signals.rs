// src/utils/signals.rs
use std::{fmt, io};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Why the process is being asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupt,
    Terminate,
    Hangup,
}

impl Termination {
    /// 128 plus the signal number, as shells report it.
    pub fn exit_code(self) -> u8 {
        match self {
            Termination::Hangup => 129,
            Termination::Interrupt => 130,
            Termination::Terminate => 143,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Termination::Interrupt => "Interrupted",
            Termination::Terminate => "Terminated",
            Termination::Hangup => "Hung up",
        };
        f.write_str(name)
    }
}

/// Handlers for every signal that ends an issuance early. Must be installed
/// from inside the tokio runtime.
pub struct TerminationSignals {
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    hangup: Signal,
}

impl TerminationSignals {
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) -> Termination {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => Termination::Interrupt,
            _ = self.terminate.recv() => Termination::Terminate,
            _ = self.hangup.recv() => Termination::Hangup,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Termination {
        let _ = tokio::signal::ctrl_c().await;
        Termination::Interrupt
    }
}
