use serde::{Deserialize, Serialize};

/// Guid carried by an uploaded file until the backend has assigned one.
pub const PLACEHOLDER_GUID: &str = "!!!placeholder!!!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub guid: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn pending(file_name: &str) -> Self {
        Self {
            guid: PLACEHOLDER_GUID.to_string(),
            file_name: file_name.to_string(),
            url: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.guid == PLACEHOLDER_GUID
    }

    /// Link target relative to the backend root: the direct url for url
    /// attachments, the upload path for stored files.
    pub fn href(&self) -> String {
        match self.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => format!("upload/{}/{}", self.guid, self.file_name),
        }
    }

    /// Replace placeholder guids with the guids returned by an upload.
    ///
    /// The backend answers with one guid per submitted file, in submission
    /// order. Entries without a matching guid keep their placeholder.
    pub fn resolve_pending(pending: Vec<Attachment>, guids: &[String]) -> Vec<Attachment> {
        let mut guids = guids.iter();
        pending
            .into_iter()
            .map(|mut attachment| {
                if attachment.is_pending() {
                    if let Some(guid) = guids.next() {
                        attachment.guid = guid.clone();
                    }
                }
                attachment
            })
            .collect()
    }
}
