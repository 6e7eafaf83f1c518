#![allow(dead_code)]
// Scripted in-memory stand-in for the REST server

use gptinder_core::error::{ClientError, Result};
use gptinder_core::gateway::{Gateway, Request};
use gptinder_core::{CredentialStore, Session};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const T0: &str = "2024-05-01T10:00:00Z";

/// Replies are consumed in order; every request is recorded.
/// Clones share the same script, so a test can keep a handle after the
/// session takes ownership of the gateway.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<VecDeque<Result<Value>>>>,
    log: Arc<Mutex<Vec<Request>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, body: Value) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn fail(&self, status: u16, detail: Option<&str>) -> &Self {
        self.replies.lock().unwrap().push_back(Err(ClientError::Api {
            status,
            detail: detail.map(str::to_string),
        }));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }
}

impl Gateway for ScriptedGateway {
    async fn send(&self, request: &Request) -> Result<Value> {
        self.log.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {:?}", request))
    }
}

/// Session over a scripted gateway and a throwaway credential store.
/// `token` pre-seeds the store so the session starts signed in.
pub fn session(
    token: Option<&str>,
) -> (Session<ScriptedGateway>, ScriptedGateway, CredentialStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let credentials = CredentialStore::new(dir.path()).unwrap();
    if let Some(token) = token {
        credentials.save_token(token).unwrap();
    }
    let gateway = ScriptedGateway::new();
    let session = Session::new(gateway.clone(), credentials.clone()).unwrap();
    (session, gateway, credentials, dir)
}
