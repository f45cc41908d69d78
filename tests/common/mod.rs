//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;

use serde::{Deserialize, Serialize};
use slotstore::{Collection, Config, JsonCodec, NoProjection, Projector, Record, RecordId};
use tempfile::TempDir;

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Record for Chat {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: RecordId,
    pub chat_id: RecordId,
    pub author: String,
    pub body: String,
}

impl Record for Message {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

/// Indexed subset of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFields {
    pub chat_id: RecordId,
    pub author: String,
}

pub struct MessageProjector;

impl Projector<Message> for MessageProjector {
    type Fields = MessageFields;

    fn project(&self, record: &Message) -> MessageFields {
        MessageFields {
            chat_id: record.chat_id,
            author: record.author.clone(),
        }
    }
}

pub type Chats = Collection<Chat, JsonCodec<Chat>, NoProjection>;
pub type Messages = Collection<Message, JsonCodec<Message>, MessageProjector>;

// =============================================================================
// Helper Functions
// =============================================================================

pub fn chat(title: &str) -> Chat {
    Chat {
        id: RecordId::nil(),
        title: title.to_string(),
        members: Vec::new(),
    }
}

pub fn message(chat_id: RecordId, author: &str, body: &str) -> Message {
    Message {
        id: RecordId::nil(),
        chat_id,
        author: author.to_string(),
        body: body.to_string(),
    }
}

pub fn test_config(path: &Path) -> Config {
    Config::builder().data_dir(path).slot_size(512).build()
}

pub fn open_chats(path: &Path) -> Chats {
    Collection::open(test_config(path), JsonCodec::new(), NoProjection).unwrap()
}

pub fn open_messages(path: &Path) -> Messages {
    Collection::open(test_config(path), JsonCodec::new(), MessageProjector).unwrap()
}

pub fn setup_temp_chats() -> (TempDir, Chats) {
    let temp_dir = TempDir::new().unwrap();
    let chats = open_chats(temp_dir.path());
    (temp_dir, chats)
}

pub fn setup_temp_messages() -> (TempDir, Messages) {
    let temp_dir = TempDir::new().unwrap();
    let messages = open_messages(temp_dir.path());
    (temp_dir, messages)
}

/// Copy an open collection's files into a fresh directory
///
/// Every write is fsynced under the default sync strategy, so the copy is
/// what a crash at this point would leave behind: a dirty index and no
/// directory lock.
pub fn crash_image(data_dir: &Path) -> TempDir {
    let image = TempDir::new().unwrap();
    for entry in std::fs::read_dir(data_dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_name() == Chats::LOCK_FILENAME {
            continue;
        }
        std::fs::copy(entry.path(), image.path().join(entry.file_name())).unwrap();
    }
    image
}
