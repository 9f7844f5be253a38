//! In-memory backend for engine tests
//!
//! Open/close calls are counted per base URL so concurrently running tests
//! don't see each other's sessions. A base URL containing `refuse-open`
//! fails to open; one containing `slow-open` never finishes opening.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::session::Backend;
use crate::common::{Error, Result, SessionOptions};

static OPENS: Mutex<Option<HashMap<String, usize>>> = Mutex::new(None);
static CLOSES: Mutex<Option<HashMap<String, usize>>> = Mutex::new(None);

fn bump(counter: &Mutex<Option<HashMap<String, usize>>>, key: &str) {
    let mut guard = counter.lock().unwrap();
    *guard
        .get_or_insert_with(HashMap::new)
        .entry(key.to_string())
        .or_insert(0) += 1;
}

fn read(counter: &Mutex<Option<HashMap<String, usize>>>, key: &str) -> usize {
    counter
        .lock()
        .unwrap()
        .as_ref()
        .and_then(|m| m.get(key).copied())
        .unwrap_or(0)
}

pub fn opens(base_url: &str) -> usize {
    read(&OPENS, base_url)
}

pub fn closes(base_url: &str) -> usize {
    read(&CLOSES, base_url)
}

pub struct FakeBackend {
    base_url: String,
    /// Log of actions performed through this backend
    pub actions: Vec<String>,
}

#[async_trait]
impl Backend for FakeBackend {
    fn kind() -> &'static str {
        "fake"
    }

    async fn open(options: &SessionOptions) -> Result<Self> {
        bump(&OPENS, &options.base_url);
        if options.base_url.contains("refuse-open") {
            return Err(Error::transport("connection refused"));
        }
        if options.base_url.contains("slow-open") {
            std::future::pending::<()>().await;
        }
        Ok(Self {
            base_url: options.base_url.clone(),
            actions: Vec::new(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        bump(&CLOSES, &self.base_url);
        Ok(())
    }
}
