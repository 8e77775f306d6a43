use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default, alias = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(default)]
    pub published_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideosResponse {
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMetrics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub clicks: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    #[serde(default)]
    pub variant_a: VariantMetrics,
    #[serde(default)]
    pub variant_b: VariantMetrics,
}

/// Server-defined lifecycle label. Only the known values get a style; the
/// raw text is always what gets rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Active,
    Completed,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbTest {
    pub test_id: String,
    pub video_id: String,
    #[serde(default)]
    pub video_title: String,
    #[serde(default)]
    pub original_thumbnail: Option<String>,
    #[serde(default)]
    pub variant_a: String,
    #[serde(default)]
    pub variant_b: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub metrics: Option<TestMetrics>,
}

impl AbTest {
    pub fn status_kind(&self) -> StatusKind {
        match self.status.as_str() {
            "pending" => StatusKind::Pending,
            "active" => StatusKind::Active,
            "completed" => StatusKind::Completed,
            _ => StatusKind::Other,
        }
    }
}

// GET /tests has been served both bare and wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TestsResponse {
    List(Vec<AbTest>),
    Wrapped { tests: Vec<AbTest> },
}

impl TestsResponse {
    pub fn into_tests(self) -> Vec<AbTest> {
        match self {
            TestsResponse::List(tests) | TestsResponse::Wrapped { tests } => tests,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateTestResponse {
    Wrapped { test: AbTest },
    Bare(AbTest),
}

impl CreateTestResponse {
    pub fn into_test(self) -> AbTest {
        match self {
            CreateTestResponse::Wrapped { test } | CreateTestResponse::Bare(test) => test,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRequest {
    pub video_id: String,
    pub video_title: String,
    pub original_thumbnail: String,
    pub variant_a: String,
    pub variant_b: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ServerErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}
