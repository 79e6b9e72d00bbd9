//! Typed content documents
//!
//! Each document owns one [`ContentKey`] and knows how to turn itself into a
//! [`ContentValue`] and back. The built-in default is the last tier of the
//! read fallback chain (server, then local cache, then default).

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::models::{ContentKey, ContentValue};

/// A document stored whole under a single content key
pub trait ContentDocument: Sized + Clone + PartialEq + Send + Sync + 'static {
    /// Key this document is stored under
    const KEY: ContentKey;

    /// Built-in content used when neither the server nor the cache has a value
    fn builtin_default() -> Self;

    /// Serialize into the opaque stored form
    fn to_value(&self) -> serde_json::Result<ContentValue>;

    /// Parse the stored form
    fn from_value(value: &ContentValue) -> serde_json::Result<Self>;
}

/// Implements the JSON round trip for documents stored as JSON text
macro_rules! json_document {
    ($ty:ty, $key:expr, $default:expr) => {
        impl ContentDocument for $ty {
            const KEY: ContentKey = $key;

            fn builtin_default() -> Self {
                $default
            }

            fn to_value(&self) -> serde_json::Result<ContentValue> {
                ContentValue::from_json(self)
            }

            fn from_value(value: &ContentValue) -> serde_json::Result<Self> {
                value.parse_json()
            }
        }
    };
}

// ==================== Header ====================

/// Number of animated header lines
pub const HEADER_LINE_COUNT: usize = 4;

/// The landing page header lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderLines([String; HEADER_LINE_COUNT]);

impl HeaderLines {
    pub fn new(lines: [String; HEADER_LINE_COUNT]) -> Self {
        Self(lines)
    }

    /// Replace one line; out-of-range indexes are ignored
    pub fn set(&mut self, index: usize, line: impl Into<String>) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = line.into();
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }
}

impl Default for HeaderLines {
    fn default() -> Self {
        Self(["I am a sharp,", "skilled,", "adept", "mind."].map(String::from))
    }
}

// Fewer than four stored lines keep the defaults for the missing positions;
// extra lines are dropped.
impl<'de> Deserialize<'de> for HeaderLines {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = Vec::<String>::deserialize(deserializer)?;
        let mut lines = HeaderLines::default();
        for (index, line) in stored.into_iter().take(HEADER_LINE_COUNT).enumerate() {
            lines.set(index, line);
        }
        Ok(lines)
    }
}

json_document!(HeaderLines, ContentKey::HeaderLines, HeaderLines::default());

// ==================== Tagline ====================

/// Tagline text, stored raw rather than as JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagline(pub String);

impl ContentDocument for Tagline {
    const KEY: ContentKey = ContentKey::Tagline;

    fn builtin_default() -> Self {
        Tagline("I am a sharp,".to_string())
    }

    fn to_value(&self) -> serde_json::Result<ContentValue> {
        Ok(ContentValue::new(self.0.clone()))
    }

    fn from_value(value: &ContentValue) -> serde_json::Result<Self> {
        Ok(Tagline(value.as_str().to_string()))
    }
}

// ==================== Skills ====================

/// A skill card in the expertise carousel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_icon_color")]
    pub icon_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Percentage, clamped to 0..=100
    #[serde(default = "default_proficiency")]
    pub proficiency_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more_link: Option<String>,
}

fn default_icon_color() -> String {
    "#00ed64".to_string()
}

fn default_proficiency() -> u8 {
    80
}

impl Skill {
    /// Create a skill with a fresh id
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            icon: String::new(),
            icon_color: default_icon_color(),
            background_image: None,
            proficiency_level: default_proficiency(),
            learn_more_link: None,
        }
    }

    pub fn set_proficiency(&mut self, level: u8) {
        self.proficiency_level = level.min(100);
    }
}

/// Ordered skill cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SkillList(pub Vec<Skill>);

impl SkillList {
    /// Remove by id, returning whether anything was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s.id != id);
        self.0.len() != before
    }
}

fn default_skills() -> SkillList {
    let skill = |id: &str, title: &str, description: &str, icon: &str, image: &str, q: &str| Skill {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        icon_color: default_icon_color(),
        background_image: Some(image.to_string()),
        proficiency_level: 85,
        learn_more_link: Some(format!("https://www.google.com/search?q={}", q)),
    };
    SkillList(vec![
        skill(
            "1",
            "Web Development",
            "Building responsive websites and web applications",
            "fa-code",
            "/images/1.png",
            "web+development",
        ),
        skill(
            "2",
            "UI/UX Design",
            "Creating intuitive and beautiful user interfaces",
            "fa-palette",
            "/images/2.png",
            "ui+ux+design",
        ),
        skill(
            "3",
            "Python",
            "Building applications with Python",
            "fab fa-python",
            "/images/3.png",
            "python",
        ),
        skill(
            "4",
            "Java",
            "Enterprise application development",
            "fab fa-java",
            "/images/4.png",
            "java",
        ),
    ])
}

json_document!(SkillList, ContentKey::Skills, default_skills());

// ==================== Projects ====================

/// A project tile in the photo grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub footer: String,
    #[serde(default)]
    pub background_style: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub project_url: String,
}

impl Project {
    /// Create a project with a fresh id
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            image_url: String::new(),
            footer: String::new(),
            background_style: String::new(),
            technologies: Vec::new(),
            stack: String::new(),
            project_url: String::new(),
        }
    }
}

/// Ordered project tiles; always an array on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProjectList(pub Vec<Project>);

impl ProjectList {
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p.id != id);
        self.0.len() != before
    }
}

json_document!(ProjectList, ContentKey::Projects, ProjectList::default());

// ==================== Uploaded images ====================

/// An image registered through the admin panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub name: String,
    /// Server URL returned by the upload endpoint, or an inline `data:` URL
    pub data: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub timestamp: i64,
}

impl UploadedImage {
    /// Reference a file stored by the upload endpoint
    pub fn from_url(name: impl Into<String>, url: impl Into<String>, mime_type: &str, size: u64) -> Self {
        Self {
            name: name.into(),
            data: url.into(),
            mime_type: mime_type.to_string(),
            size,
            timestamp: crate::now_millis(),
        }
    }

    /// Embed the image bytes as a base64 `data:` URL
    pub fn inline(name: impl Into<String>, mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            name: name.into(),
            data: format!("data:{};base64,{}", mime_type, encoded),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            timestamp: crate::now_millis(),
        }
    }

    pub fn is_inline(&self) -> bool {
        self.data.starts_with("data:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UploadedImageList(pub Vec<UploadedImage>);

json_document!(
    UploadedImageList,
    ContentKey::UploadedImages,
    UploadedImageList::default()
);

// ==================== Verified section ====================

/// An academic result card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

impl AcademicResult {
    pub fn new(title: impl Into<String>, description: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            image_url: image_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// The "verified" credentials section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedContent {
    #[serde(default)]
    pub about_text: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub results: Vec<AcademicResult>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

impl Default for VerifiedContent {
    fn default() -> Self {
        Self {
            about_text: "Default about text".to_string(),
            photo_url: "/images/default-profile.jpg".to_string(),
            results: vec![AcademicResult {
                id: "1".to_string(),
                title: "Academic Result 1".to_string(),
                description: "Description of academic achievement 1".to_string(),
                image_url: "/images/result1.jpg".to_string(),
            }],
            faqs: vec![Faq {
                id: "1".to_string(),
                question: "What is your educational background?".to_string(),
                answer: "I have a degree in Computer Science.".to_string(),
            }],
        }
    }
}

impl VerifiedContent {
    pub fn remove_result(&mut self, id: &str) -> bool {
        let before = self.results.len();
        self.results.retain(|r| r.id != id);
        self.results.len() != before
    }
}

json_document!(VerifiedContent, ContentKey::Verified, VerifiedContent::default());

/// Stored form of the built-in default for `key`
pub fn builtin_default_value(key: ContentKey) -> serde_json::Result<ContentValue> {
    match key {
        ContentKey::HeaderLines => HeaderLines::builtin_default().to_value(),
        ContentKey::Tagline => Tagline::builtin_default().to_value(),
        ContentKey::Skills => SkillList::builtin_default().to_value(),
        ContentKey::Projects => ProjectList::builtin_default().to_value(),
        ContentKey::UploadedImages => UploadedImageList::builtin_default().to_value(),
        ContentKey::Verified => VerifiedContent::builtin_default().to_value(),
    }
}

/// Short random id for new list entries
fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}
