// src/classify/rules.rs
//! Tag rule table: TOML schema, loading, and the built-in default table.
//!
//! ```toml
//! [[rules]]
//! tag = "Python"
//! keywords = ["python", "django"]
//! threshold = 1.0
//!
//! [[rules.patterns]]
//! pattern = '\bpy\b'
//! weight = 2.0
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_TAG_RULES_PATH: &str = "ARCHIVE_TAG_RULES_PATH";
pub const DEFAULT_TAG_RULES_PATH: &str = "config/tag_rules.toml";

pub const DEFAULT_PATTERN_WEIGHT: f32 = 2.0;
pub const DEFAULT_THRESHOLD: f32 = 1.0;

fn default_pattern_weight() -> f32 {
    DEFAULT_PATTERN_WEIGHT
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub rules: Vec<TagRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: String,
    /// Case-insensitive literal terms, each counted at most once.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    #[serde(default = "default_pattern_weight")]
    pub weight: f32,
}

impl TagRule {
    /// Rule with default-weight patterns and the default threshold.
    pub fn new(tag: &str, keywords: &[&str], patterns: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            patterns: patterns
                .iter()
                .map(|p| PatternRule {
                    pattern: p.to_string(),
                    weight: DEFAULT_PATTERN_WEIGHT,
                })
                .collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl RuleTable {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self { rules }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML or JSON file (chosen by extension).
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tag rules from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing tag rules JSON {}", path.display()))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing tag rules TOML {}", path.display()))
        }
    }

    /// Resolve the rule table:
    /// 1) $ARCHIVE_TAG_RULES_PATH (must exist)
    /// 2) config/tag_rules.toml
    /// 3) built-in table
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_TAG_RULES_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_TAG_RULES_PATH} points to non-existent path"));
            }
            return Self::from_path(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_TAG_RULES_PATH);
        if default_p.exists() {
            return Self::from_path(&default_p);
        }
        Ok(Self::builtin())
    }

    /// Built-in table with common software-topic categories.
    /// Used as fallback if no config is found.
    pub fn builtin() -> Self {
        let rules = vec![
            TagRule::new(
                "Python",
                &["python", "django", "flask", "pandas", "numpy", "fastapi", "pytest", "pip", "conda", "jupyter"],
                &[r"\bpy\b", r"python\s*\d", r"\.py\b"],
            ),
            TagRule::new(
                "JavaScript/Node",
                &["javascript", "node", "nodejs", "npm", "yarn", "express", "nest", "typescript", "js"],
                &[r"\bjs\b", r"node\.js", r"\.js\b"],
            ),
            TagRule::new(
                "AI/ML",
                &[
                    "artificial intelligence", "machine learning", "deep learning", "neural network",
                    "tensorflow", "pytorch", "scikit-learn", "keras", "opencv", "nlp", "computer vision",
                ],
                &[r"\bai\b", r"\bml\b", r"neural\s+network"],
            ),
            TagRule::new(
                "LLM/GPT",
                &[
                    "llm", "gpt", "chatgpt", "openai", "claude", "transformer", "bert",
                    "large language model", "prompt engineering", "fine-tuning", "embedding",
                ],
                &[r"gpt-?\d", r"\bllm\b"],
            ),
            TagRule::new(
                "AWS/Cloud",
                &[
                    "aws", "amazon web services", "ec2", "s3", "lambda", "cloudformation", "terraform",
                    "azure", "gcp", "google cloud", "kubernetes", "docker", "serverless",
                ],
                &[r"\baws\b", r"\bgcp\b", r"\bk8s\b"],
            ),
            TagRule::new(
                "Linux/DevOps",
                &[
                    "linux", "ubuntu", "centos", "bash", "shell", "devops", "ci/cd", "jenkins",
                    "gitlab", "github actions", "ansible", "puppet", "chef",
                ],
                &[r"ci/cd", r"\.sh\b"],
            ),
            TagRule::new(
                "React/Frontend",
                &["react", "reactjs", "jsx", "redux", "next.js", "gatsby", "hooks", "component"],
                &[r"react\.js", r"next\.js"],
            ),
            TagRule::new(
                "Angular",
                &["angular", "angularjs", "typescript", "rxjs", "ngrx", "ionic"],
                &[r"angular\s*\d+"],
            ),
            TagRule::new(
                "HTML/CSS/Browser",
                &[
                    "html", "css", "sass", "scss", "bootstrap", "tailwind", "responsive", "frontend",
                    "browser", "dom", "web development", "css3", "html5",
                ],
                &[r"\bdom\b", r"css\d?", r"html\d?"],
            ),
            TagRule::new(
                "Database",
                &[
                    "database", "sql", "mysql", "postgresql", "mongodb", "redis", "elasticsearch",
                    "nosql", "orm", "prisma", "sequelize",
                ],
                &[r"\bsql\b", r"\bdb\b"],
            ),
            TagRule::new(
                "Mobile",
                &["mobile", "ios", "android", "flutter", "react native", "swift", "kotlin", "xamarin"],
                &[r"react\s+native", r"\bios\b"],
            ),
            TagRule::new(
                "Security",
                &[
                    "security", "authentication", "authorization", "oauth", "jwt", "encryption",
                    "cybersecurity", "vulnerability", "penetration testing",
                ],
                &[r"\bauth\b", r"\bjwt\b"],
            ),
            TagRule::new(
                "Social/Career",
                &[
                    "career", "interview", "job", "hiring", "remote work", "freelance", "startup",
                    "leadership", "management", "team", "culture", "diversity", "inclusion",
                ],
                &[r"remote\s+work"],
            ),
            TagRule::new(
                "Tutorial/Learning",
                &[
                    "tutorial", "guide", "beginner", "learn", "course", "education", "teaching",
                    "how to", "step by step", "getting started",
                ],
                &[r"how\s+to", r"step\s+by\s+step"],
            ),
            TagRule::new(
                "Performance",
                &[
                    "performance", "optimization", "speed", "benchmark", "profiling", "caching",
                    "memory", "cpu", "latency", "scaling",
                ],
                &[r"performance", r"optimization"],
            ),
        ];
        Self { rules }
    }
}
