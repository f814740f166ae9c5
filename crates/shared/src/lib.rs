// Public modules
pub mod config;
pub mod cookies;
pub mod extractor;
pub mod io;
pub mod linkedin;
pub mod models;
pub mod news;
pub mod session;
pub mod summarizer;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use extractor::ContentExtractor;
pub use io::{ConfigFileSink, CookieSink};
pub use linkedin::{LinkedInClient, PostError};
pub use models::{Article, ChatMessage, MediaItem, Role};
pub use news::NewsClient;
pub use session::SessionCookies;
pub use summarizer::ChatSummarizer;
pub use workflow::{Console, Outcome, RunOptions, Settings, Workflow};
