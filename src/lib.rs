pub mod charset;
pub mod cli;
pub mod context;
pub mod css;
pub mod dom;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod html_rewriter;
pub mod logging;
pub mod pipeline;
pub mod srcset;
pub mod url_resolver;

// Re-export main types for convenience
pub use cli::LocalizeCommand;
pub use context::{ResolutionContext, ResolutionMode};
pub use downloader::{AssetFetcher, FetchConfig, FetchOutcome, FetchReport};
pub use error::LocalizeError;
pub use file_manager::FileManager;
pub use html_rewriter::DocumentRewriter;
pub use pipeline::{PipelineConfig, PipelineOutcome};
pub use url_resolver::AssetReference;
