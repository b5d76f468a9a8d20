use std::fmt::{Display, Formatter};

use vizpipe_types::log::warn;

use super::key::KeyId;
use super::keys::{REQUEST_DATA, REQUEST_DATA_OBJECT, REQUEST_INFORMATION, REQUEST_UPDATE_EXTENT};
use super::value::Value;
use super::Information;
use crate::errors::InformationError;

/// A key whose presence marks an information object as a request. At most one request key
/// may be set on an information object at a time.
#[derive(Debug, Clone, Copy)]
pub struct RequestKey {
    id: KeyId,
}

impl RequestKey {
    pub const fn new(name: &'static str, location: &'static str) -> Self {
        Self {
            id: KeyId::new(name, location),
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Marks `info` with this request. A different request already present is replaced and
    /// returned.
    pub fn set(&self, info: &mut Information) -> Option<KeyId> {
        let displaced = info.request_key().filter(|current| *current != self.id);
        if let Some(current) = displaced {
            warn!(
                "Request {} replaces request {} that was still set",
                self.id, current
            );
            info.remove_entry(&current);
        }
        info.insert_entry(self.id, Value::Request);
        displaced
    }

    /// Like [`set`](Self::set) but fails instead of replacing another request.
    pub fn try_set(&self, info: &mut Information) -> Result<(), InformationError> {
        match info.request_key() {
            Some(current) if current != self.id => Err(InformationError::RequestConflict {
                current,
                requested: self.id,
            }),
            _ => {
                info.insert_entry(self.id, Value::Request);
                Ok(())
            }
        }
    }

    pub fn has(&self, info: &Information) -> bool {
        matches!(info.entry(&self.id), Some(Value::Request))
    }

    pub fn remove(&self, info: &mut Information) {
        info.remove_entry(&self.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The four requests the executive sends, in the order one update issues them.
pub enum RequestKind {
    DataObject,
    Information,
    UpdateExtent,
    Data,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::DataObject,
        RequestKind::Information,
        RequestKind::UpdateExtent,
        RequestKind::Data,
    ];

    pub fn key(&self) -> RequestKey {
        match self {
            RequestKind::DataObject => REQUEST_DATA_OBJECT,
            RequestKind::Information => REQUEST_INFORMATION,
            RequestKind::UpdateExtent => REQUEST_UPDATE_EXTENT,
            RequestKind::Data => REQUEST_DATA,
        }
    }

    pub fn from_key(id: KeyId) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key().id() == id)
    }

    /// A fresh request information object carrying only this request.
    pub fn new_request(&self) -> Information {
        let mut request = Information::new();
        self.key().set(&mut request);
        request
    }
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key().id().name)
    }
}
