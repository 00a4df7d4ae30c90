//! Test doubles for the prompt and keystore collaborators, plus a log sink

use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::interrupt::Interrupter;
use crate::keystore::{CredentialStore, MasterKey};

/// Interrupter answering from fixed queues
pub struct ScriptedInterrupter {
    inputs: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    input_calls: AtomicUsize,
    secret_calls: AtomicUsize,
}

impl ScriptedInterrupter {
    pub fn new(inputs: &[&str], secrets: &[&str]) -> Self {
        Self {
            inputs: Mutex::new(inputs.iter().map(|s| s.to_string()).collect()),
            secrets: Mutex::new(secrets.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            input_calls: AtomicUsize::new(0),
            secret_calls: AtomicUsize::new(0),
        }
    }

    pub fn input_calls(&self) -> usize {
        self.input_calls.load(Ordering::SeqCst)
    }

    pub fn secret_calls(&self) -> usize {
        self.secret_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Interrupter for ScriptedInterrupter {
    async fn request_input(&self, prompt: &str, _hint: &str) -> Result<String> {
        self.input_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.inputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Prompt("no scripted input left".into()))
    }

    async fn request_secret_input(&self, prompt: &str) -> Result<Zeroizing<String>> {
        self.secret_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.secrets
            .lock()
            .unwrap()
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| Error::Prompt("no scripted secret left".into()))
    }
}

/// Store wrapper counting collaborator calls
pub struct CountingStore<S = crate::keystore::MemoryKeystore> {
    inner: S,
    derive_calls: AtomicUsize,
    read_calls: AtomicUsize,
    reads: Mutex<Vec<String>>,
}

impl<S: CredentialStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            derive_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn derive_calls(&self) -> usize {
        self.derive_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Names passed to `read_value`, in call order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: CredentialStore> CredentialStore for CountingStore<S> {
    fn location(&self) -> String {
        self.inner.location()
    }

    async fn is_initialized(&self) -> Result<bool> {
        self.inner.is_initialized().await
    }

    async fn list_registered_names(&self) -> Result<BTreeSet<String>> {
        self.inner.list_registered_names().await
    }

    async fn derive_master_key(&self, password: &str) -> Result<MasterKey> {
        self.derive_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.derive_master_key(password).await
    }

    async fn read_value(&self, name: &str, master_key: &MasterKey) -> Result<Zeroizing<String>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.reads.lock().unwrap().push(name.to_string());
        self.inner.read_value(name, master_key).await
    }
}

/// In-memory sink for formatted tracing events
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on the current thread here until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged at `level`, e.g. "WARN"
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().any(|word| word == level))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
