//! Output cache shared by the steps of one run
//!
//! Entries are keyed by `(step, name)`. Only the step's own [`StepOutput`]
//! writes them, and a name is append-only: a second write is an error
//! unless both writes are `multi`.

use crate::error::OutputError;
use crate::sink::OutputSink;
use netdrill_core::OutputRecord;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Values one step wrote under one name
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub multi: bool,
    pub values: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct OutputCache {
    entries: Mutex<HashMap<(usize, String), CacheEntry>>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step: usize, name: &str) -> Option<CacheEntry> {
        self.entries.lock().get(&(step, name.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Create an empty multi entry unless `name` already holds one
    fn open_multi(&self, step: usize, name: &str) -> Result<(), OutputError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry((step, name.to_string()))
            .or_insert_with(|| CacheEntry {
                multi: true,
                values: Vec::new(),
            });
        if !entry.multi {
            return Err(OutputError::Duplicate {
                name: name.to_string(),
                step,
            });
        }
        Ok(())
    }

    fn write(&self, step: usize, name: &str, value: Value, multi: bool) -> Result<(), OutputError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(&(step, name.to_string())) {
            Some(entry) if entry.multi && multi => {
                entry.values.push(value);
                Ok(())
            }
            Some(_) => Err(OutputError::Duplicate {
                name: name.to_string(),
                step,
            }),
            None => {
                entries.insert(
                    (step, name.to_string()),
                    CacheEntry {
                        multi,
                        values: vec![value],
                    },
                );
                Ok(())
            }
        }
    }
}

/// Output handle bound to one step
#[derive(Clone)]
pub struct StepOutput {
    step: usize,
    cache: Arc<OutputCache>,
    sink: Arc<dyn OutputSink>,
}

impl StepOutput {
    pub fn new(step: usize, cache: Arc<OutputCache>, sink: Arc<dyn OutputSink>) -> Self {
        Self { step, cache, sink }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Write `value` under `name`; sensitive values stay out of the observation stream
    pub fn emit<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        multi: bool,
        sensitive: bool,
    ) -> Result<(), OutputError> {
        let value = serde_json::to_value(value).map_err(|source| OutputError::Serialization {
            name: name.to_string(),
            step: self.step,
            source,
        })?;
        self.cache.write(self.step, name, value.clone(), multi)?;

        if sensitive {
            debug!("Step {} wrote sensitive output {}", self.step, name);
            return Ok(());
        }
        let record = OutputRecord::new(self.step, name, value, multi);
        self.sink
            .record(&record)
            .map_err(|source| OutputError::Sink {
                name: name.to_string(),
                step: self.step,
                source,
            })
    }

    /// Declare `name` as a multi output so it resolves to `[]` when nothing is written
    pub fn declare_multi(&self, name: &str) -> Result<(), OutputError> {
        self.cache.open_multi(self.step, name)
    }

    /// Write every item as one value of a multi output
    pub fn emit_all<'a, T, I>(&self, name: &str, items: I, sensitive: bool) -> Result<(), OutputError>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for item in items {
            self.emit(name, item, true, sensitive)?;
        }
        Ok(())
    }
}
