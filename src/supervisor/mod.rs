//! # Server Supervisor
//!
//! Runs independently configured listeners (HTTP, gRPC) side by side and
//! stops them together.
//!
//! Shutdown begins on the first of: a termination signal, an explicit
//! [`SupervisorHandle::shutdown`], or a fatal error from any unit. Each unit
//! then drains for at most its own `shutdown_timeout`; a unit that overruns
//! is aborted and reported as [`UnitError::ShutdownTimeout`] without
//! affecting its siblings.

mod errors;
mod signals;
mod unit;

pub use errors::{SupervisorError, UnitError, UnitFailure};
pub use signals::TerminationSignals;
pub use unit::{join_host_port, ServerUnit, UnitSettings, UnitState};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::observability::Logger;

#[derive(Debug, Clone, Copy)]
struct UnitStatus {
    state: UnitState,
    local_addr: Option<SocketAddr>,
}

type StatusMap = BTreeMap<String, UnitStatus>;

/// Observes and stops a running [`Supervisor`]
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    shutdown: CancellationToken,
    status: Arc<watch::Sender<StatusMap>>,
}

impl SupervisorHandle {
    fn new() -> Self {
        let (status, _) = watch::channel(StatusMap::new());
        Self {
            shutdown: CancellationToken::new(),
            status: Arc::new(status),
        }
    }

    /// Begin graceful shutdown of every unit
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            Logger::info("SUPERVISOR_SHUTDOWN", &[("reason", "requested")]);
            self.shutdown.cancel();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled when shutdown begins
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn state(&self, unit: &str) -> Option<UnitState> {
        self.status.borrow().get(unit).map(|s| s.state)
    }

    /// Address the unit's listener is bound to, once running
    pub fn local_addr(&self, unit: &str) -> Option<SocketAddr> {
        self.status.borrow().get(unit).and_then(|s| s.local_addr)
    }

    /// Wait until `unit` has left `Starting`; returns its bound address
    pub async fn wait_started(&self, unit: &str) -> Option<SocketAddr> {
        let mut rx = self.status.subscribe();
        let status = rx
            .wait_for(|units| {
                units
                    .get(unit)
                    .map_or(true, |s| s.state != UnitState::Starting)
            })
            .await
            .ok()?;
        status.get(unit).and_then(|s| s.local_addr)
    }

    fn set_state(&self, unit: &str, state: UnitState) {
        self.status.send_modify(|units| {
            units
                .entry(unit.to_string())
                .and_modify(|s| s.state = state)
                .or_insert(UnitStatus {
                    state,
                    local_addr: None,
                });
        });
    }

    fn set_running(&self, unit: &str, local_addr: Option<SocketAddr>) {
        self.status.send_modify(|units| {
            units.insert(
                unit.to_string(),
                UnitStatus {
                    state: UnitState::Running,
                    local_addr,
                },
            );
        });
    }
}

/// Starts units concurrently and supervises them until all have stopped
pub struct Supervisor {
    units: Vec<Box<dyn ServerUnit>>,
    handle: SupervisorHandle,
    listen_signals: bool,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            handle: SupervisorHandle::new(),
            listen_signals: true,
        }
    }

    pub fn with_unit(self, unit: impl ServerUnit) -> Self {
        self.with_boxed_unit(Box::new(unit))
    }

    pub fn with_boxed_unit(mut self, unit: Box<dyn ServerUnit>) -> Self {
        let state = if unit.settings().enabled {
            UnitState::Starting
        } else {
            UnitState::Disabled
        };
        self.handle.set_state(unit.name(), state);
        self.units.push(unit);
        self
    }

    /// Do not install OS signal handlers; shutdown only through the handle
    /// or a unit failure
    pub fn without_signals(mut self) -> Self {
        self.listen_signals = false;
        self
    }

    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    /// Run every enabled unit until all have stopped
    ///
    /// Returns `Ok(())` only if no unit failed to bind, failed while
    /// serving, panicked, or overran its shutdown timeout.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let Supervisor {
            units,
            handle,
            listen_signals,
        } = self;

        let mut enabled = Vec::with_capacity(units.len());
        for unit in units {
            if unit.settings().enabled {
                enabled.push(unit);
            } else {
                handle.set_state(unit.name(), UnitState::Disabled);
                Logger::info("UNIT_DISABLED", &[("unit", unit.name())]);
            }
        }

        if enabled.is_empty() {
            Logger::warn("SUPERVISOR_NO_UNITS", &[]);
            return Ok(());
        }

        // Handlers go in before any unit binds, so an early signal still
        // takes the graceful path
        let signals = if listen_signals {
            match TerminationSignals::install() {
                Ok(signals) => Some(tokio::spawn(watch_signals(
                    signals,
                    handle.shutdown.clone(),
                ))),
                Err(err) => {
                    Logger::error("SIGNAL_HANDLER_FAILED", &[("error", &err.to_string())]);
                    None
                }
            }
        } else {
            None
        };

        let mut set = JoinSet::new();
        for unit in enabled {
            let name = unit.name().to_string();
            let handle = handle.clone();
            set.spawn(async move {
                let result = AssertUnwindSafe(run_unit(unit, &handle))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        handle.set_state(&name, UnitState::Stopped);
                        Err(UnitError::Panicked(panic_message(payload)))
                    });
                (name, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (unit, result) = match joined {
                Ok(outcome) => outcome,
                // Unit tasks catch their own panics and the set is never
                // aborted, so a bare join error has no unit to blame
                Err(err) => ("supervisor".to_string(), Err(join_error(err))),
            };

            if let Err(error) = result {
                Logger::error(
                    "UNIT_FAILED",
                    &[("unit", &unit), ("error", &error.to_string())],
                );
                if !handle.shutdown.is_cancelled() {
                    Logger::info(
                        "SUPERVISOR_SHUTDOWN",
                        &[("reason", "unit_failure"), ("unit", &unit)],
                    );
                    handle.shutdown.cancel();
                }
                failures.push(UnitFailure { unit, error });
            }
        }

        if let Some(task) = signals {
            task.abort();
        }

        Logger::info(
            "SUPERVISOR_STOPPED",
            &[("failures", &failures.len().to_string())],
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SupervisorError::new(failures))
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

async fn watch_signals(mut signals: TerminationSignals, shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        signal = signals.recv() => {
            Logger::info("SUPERVISOR_SHUTDOWN", &[("reason", "signal"), ("signal", signal)]);
            shutdown.cancel();
        }
    }
}

/// Drive one unit through Starting, Running, ShuttingDown and Stopped
async fn run_unit(unit: Box<dyn ServerUnit>, handle: &SupervisorHandle) -> Result<(), UnitError> {
    let name = unit.name().to_string();
    let settings = unit.settings().clone();
    let address = settings.address();
    let shutdown = handle.shutdown.clone();

    handle.set_state(&name, UnitState::Starting);

    let bound = tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        bound = TcpListener::bind(&address) => Some(bound),
    };

    let listener = match bound {
        None => {
            Logger::info("UNIT_START_ABANDONED", &[("unit", &name)]);
            handle.set_state(&name, UnitState::Stopped);
            return Ok(());
        }
        Some(Err(source)) => {
            handle.set_state(&name, UnitState::Stopped);
            return Err(UnitError::Bind { address, source });
        }
        Some(Ok(listener)) => listener,
    };

    let local_addr = listener.local_addr().ok();
    handle.set_running(&name, local_addr);
    Logger::info(
        "UNIT_STARTED",
        &[
            ("unit", &name),
            (
                "address",
                &local_addr.map_or_else(|| address.clone(), |a| a.to_string()),
            ),
        ],
    );

    let mut task = tokio::spawn(unit.serve(listener, shutdown.clone()));

    let finished_early = tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        joined = &mut task => Some(joined),
    };

    let result = match finished_early {
        Some(joined) => match flatten(joined) {
            Ok(()) => Err(UnitError::Serve(
                "stopped before shutdown was requested".to_string(),
            )),
            Err(err) => Err(err),
        },
        None => {
            handle.set_state(&name, UnitState::ShuttingDown);
            Logger::info(
                "UNIT_SHUTTING_DOWN",
                &[
                    ("unit", &name),
                    (
                        "timeout_ms",
                        &settings.shutdown_timeout.as_millis().to_string(),
                    ),
                ],
            );

            match tokio::time::timeout(settings.shutdown_timeout, &mut task).await {
                Ok(joined) => flatten(joined),
                Err(_) => {
                    task.abort();
                    Err(UnitError::ShutdownTimeout {
                        timeout: settings.shutdown_timeout,
                    })
                }
            }
        }
    };

    handle.set_state(&name, UnitState::Stopped);
    Logger::info(
        "UNIT_STOPPED",
        &[("unit", &name), ("clean", if result.is_ok() { "true" } else { "false" })],
    );
    result
}

fn flatten(joined: Result<Result<(), UnitError>, JoinError>) -> Result<(), UnitError> {
    joined.unwrap_or_else(|err| Err(join_error(err)))
}

fn join_error(err: JoinError) -> UnitError {
    if err.is_panic() {
        UnitError::Panicked(panic_message(err.into_panic()))
    } else {
        UnitError::Serve(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
