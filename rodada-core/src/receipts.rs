use crate::errors::ReceiptError;
use rodada_schema::records::ReceiptRef;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const ACCEPTED: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/heic", "heic"),
];

/// Payment receipt images stored as `<uuid>.<ext>` under one directory.
#[derive(Clone, Debug)]
pub struct ReceiptBucket {
    root: Arc<PathBuf>,
    public_base_url: Arc<str>,
    max_bytes: usize,
}

impl ReceiptBucket {
    pub fn open(
        root: impl AsRef<Path>,
        public_base_url: &str,
        max_bytes: usize,
    ) -> Result<Self, ReceiptError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: Arc::new(root),
            public_base_url: Arc::from(public_base_url.trim_end_matches('/')),
            max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn upload(&self, bytes: &[u8], content_type: &str) -> Result<ReceiptRef, ReceiptError> {
        let content_type = normalize_content_type(content_type);
        let extension = extension_for(&content_type)
            .ok_or_else(|| ReceiptError::UnsupportedType(content_type.clone()))?;
        if bytes.is_empty() {
            return Err(ReceiptError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(ReceiptError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let id = Uuid::new_v4().to_string();
        let path = self.root.join(format!("{id}.{extension}"));
        std::fs::write(&path, bytes)?;
        debug!(receipt = %id, size = bytes.len(), "receipt stored");

        Ok(ReceiptRef {
            url: self.url_for(&id),
            id,
            content_type,
        })
    }

    pub fn open_receipt(&self, id: &str) -> Result<(Vec<u8>, &'static str), ReceiptError> {
        if Uuid::parse_str(id).is_err() {
            return Err(ReceiptError::NotFound(id.to_string()));
        }
        for (content_type, extension) in ACCEPTED {
            let path = self.root.join(format!("{id}.{extension}"));
            match std::fs::read(&path) {
                Ok(bytes) => return Ok((bytes, content_type)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(ReceiptError::NotFound(id.to_string()))
    }

    pub fn url_for(&self, id: &str) -> String {
        format!("{}/receipts/{id}", self.public_base_url)
    }
}

fn normalize_content_type(value: &str) -> String {
    let essence = value.split(';').next().unwrap_or_default();
    let essence = essence.trim().to_ascii_lowercase();
    if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ACCEPTED
        .iter()
        .find(|(accepted, _)| *accepted == content_type)
        .map(|(_, ext)| *ext)
}
