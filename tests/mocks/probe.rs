//! Membership probe backed by a table the test edits

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use linguabot::gate::{MemberStatus, MembershipProbe, ProbeError};

/// Unknown (chat, user) pairs answer `Left`.
#[derive(Default)]
pub struct FakeProbe {
    statuses: Mutex<HashMap<(i64, i64), MemberStatus>>,
    broken_chats: Mutex<HashSet<i64>>,
    calls: Mutex<usize>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chat_id: i64, user_id: i64, status: MemberStatus) {
        self.statuses.lock().unwrap().insert((chat_id, user_id), status);
    }

    /// Every lookup in `chat_id` errors from now on.
    pub fn break_chat(&self, chat_id: i64) {
        self.broken_chats.lock().unwrap().insert(chat_id);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MembershipProbe for FakeProbe {
    async fn member_status(&self, chat_id: i64, user_id: i64) -> Result<MemberStatus, ProbeError> {
        *self.calls.lock().unwrap() += 1;
        if self.broken_chats.lock().unwrap().contains(&chat_id) {
            return Err(ProbeError(format!("Bad Request: member list is inaccessible in {}", chat_id)));
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&(chat_id, user_id))
            .copied()
            .unwrap_or(MemberStatus::Left))
    }
}
