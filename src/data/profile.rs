use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const BUILTIN_PROFILE: &str = include_str!("../../profile/profile.yml");

/// Errors that can occur while loading a profile record
#[derive(Debug)]
pub enum ProfileError {
    Read(PathBuf, std::io::Error),
    Parse(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfileError::Read(path, e) => {
                write!(f, "Failed to read profile {}: {}", path.display(), e)
            }
            ProfileError::Parse(details) => write!(f, "Invalid profile YAML: {}", details),
        }
    }
}

impl std::error::Error for ProfileError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub date_range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub school: String,
    #[serde(default)]
    pub location: String,
    pub focus: String,
    pub date_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub linkedin: String,
    pub github: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeLink {
    pub title: String,
    pub href: String,
}

/// Read-only résumé record behind canned answers and specialized blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub tagline: String,
    #[serde(default)]
    pub about: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    pub contact: Contact,
    #[serde(default)]
    pub ai_tools: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub resume: Option<ResumeLink>,
}

impl Profile {
    /// The profile compiled into the binary
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_yaml(BUILTIN_PROFILE)
    }

    /// Loads a profile from `path`, or the built-in one when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ProfileError> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|e| ProfileError::Read(path.to_path_buf(), e))?;
                Self::from_yaml(&content)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ProfileError> {
        serde_yaml::from_str(content).map_err(|e| ProfileError::Parse(e.to_string()))
    }

    /// First biography paragraph, empty when the profile has none
    pub fn lead_paragraph(&self) -> &str {
        self.about.first().map(String::as_str).unwrap_or_default()
    }
}
