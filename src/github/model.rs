use serde::{Deserialize, Serialize};

/// The subset of a listed repository the scanner looks at.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    #[serde(rename = "html_url")]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RepositoryRecord {
    pub fn new(url: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            url: url.into(),
            description: description.map(str::to_string),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub login: String,
}
