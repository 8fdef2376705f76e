#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::sync::OnceLock;

use csrkit::error::{CsrKitError, Result};
use csrkit::key::KeyHandle;
use csrkit::material::KeyGenerator;

/// Two distinct 2048-bit keys, generated once per test binary.
pub fn fixture_keys() -> &'static [KeyHandle; 2] {
    static KEYS: OnceLock<[KeyHandle; 2]> = OnceLock::new();
    KEYS.get_or_init(|| {
        [
            KeyHandle::generate_rsa(2048).unwrap(),
            KeyHandle::generate_rsa(2048).unwrap(),
        ]
    })
}

/// Hands out the fixture keys in turn and records every requested size.
#[derive(Default)]
pub struct RecordingGenerator {
    pub requested: RefCell<Vec<usize>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> usize {
        self.requested.borrow().len()
    }
}

impl KeyGenerator for RecordingGenerator {
    fn generate(&self, bits: usize) -> Result<KeyHandle> {
        let mut requested = self.requested.borrow_mut();
        let key = fixture_keys()[requested.len() % 2].clone();
        requested.push(bits);
        Ok(key)
    }
}

/// Fails every call, like a broken entropy source.
#[derive(Default)]
pub struct FailingGenerator {
    pub calls: Cell<usize>,
}

impl KeyGenerator for FailingGenerator {
    fn generate(&self, _bits: usize) -> Result<KeyHandle> {
        self.calls.set(self.calls.get() + 1);
        Err(CsrKitError::KeyGenerationError(
            "entropy source unavailable".to_string(),
        ))
    }
}
