//! Scripted stand-in for the stock service used by the worker tests.

use super::compact_id::CompactId;
use crate::stock_api::{ApiError, Item, StockApi};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::dispatcher::DefaultGuard;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;

pub(crate) fn id(n: u8) -> CompactId {
    let mut bytes = [0u8; 16];
    bytes[15] = n;
    CompactId::from_bytes(bytes)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    NotFound,
    ServerFault,
    Status(u16),
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::NotFound => ApiError::NotFound,
            Failure::ServerFault => ApiError::ServerFault,
            Failure::Status(code) => ApiError::UnexpectedStatus(code),
        }
    }
}

/// How the fake service answers for one identifier.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    quantity: i64,
    echo: Option<String>,
    fetch_error: Option<Failure>,
    alert_error: Option<Failure>,
    panics: bool,
}

impl Script {
    pub(crate) fn quantity(quantity: i64) -> Self {
        Self {
            quantity,
            echo: None,
            fetch_error: None,
            alert_error: None,
            panics: false,
        }
    }

    pub(crate) fn echo(mut self, uuid: &str) -> Self {
        self.echo = Some(uuid.to_string());
        self
    }

    pub(crate) fn fetch_fails(mut self, failure: Failure) -> Self {
        self.fetch_error = Some(failure);
        self
    }

    pub(crate) fn alert_fails(mut self, failure: Failure) -> Self {
        self.alert_error = Some(failure);
        self
    }

    pub(crate) fn panics(mut self) -> Self {
        self.panics = true;
        self
    }
}

/// Unknown identifiers answer `NotFound`, like a service that never heard of them.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    scripts: HashMap<String, Script>,
    latency: Duration,
    fetches: AtomicUsize,
    alerts: AtomicUsize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, id: CompactId, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fetch calls started.
    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Fetch calls that returned.
    pub(crate) fn finished_fetches(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn alerts(&self) -> usize {
        self.alerts.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StockApi for ScriptedApi {
    async fn fetch_item(&self, uuid: &str) -> Result<Item, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.call().await;
        self.finished.fetch_add(1, Ordering::SeqCst);

        let Some(script) = self.scripts.get(uuid) else {
            return Err(ApiError::NotFound);
        };
        if script.panics {
            panic!("scripted panic for {}", uuid);
        }
        if let Some(failure) = script.fetch_error {
            return Err(failure.to_error());
        }
        Ok(Item {
            uuid: script.echo.clone().unwrap_or_else(|| uuid.to_string()),
            name: format!("item {}", &uuid[24..]),
            quantity: script.quantity,
        })
    }

    async fn post_alert(&self, uuid: &str) -> Result<(), ApiError> {
        self.alerts.fetch_add(1, Ordering::SeqCst);
        self.call().await;

        match self.scripts.get(uuid).and_then(|s| s.alert_error) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

/// Collects formatted log output of the current thread for assertions.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub(crate) fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::dispatcher::set_default(&Dispatch::new(subscriber))
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

pub(crate) struct LogWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
