use clap::Parser;
use std::path::PathBuf;

use crate::downloader::{FetchConfig, DEFAULT_USER_AGENT};
use crate::pipeline::PipelineConfig;

/// Exit code for command-line usage errors (`EX_USAGE`), distinct from every
/// code a `LocalizeError` maps to.
pub const USAGE_EXIT_CODE: u8 = 64;

/// Exit code for a failed argument parse: 0 for `--help`/`--version`.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        USAGE_EXIT_CODE
    } else {
        0
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "page-localizer",
    about = "Turn a fetched HTML page into a self-contained offline copy",
    version,
    long_about = "Downloads every image, stylesheet and icon a saved HTML page references into a directory tree mirroring the origin URLs, rewrites the page (and its stylesheets) to point at the local copies, and strips scripts and iframes. The result is written next to the input as <INPUT>-processed.html."
)]
pub struct LocalizeCommand {
    /// The previously fetched HTML file
    #[arg(required = true)]
    pub input: PathBuf,

    /// The URL the page was fetched from; relative references are resolved
    /// against it. Without it, references must already be absolute
    pub source_url: Option<String>,

    /// Keep going when an asset download fails instead of aborting
    #[arg(short = 'k', long)]
    pub skip_errors: bool,

    /// Directory the downloaded assets are stored under
    #[arg(short, long, default_value = ".")]
    pub output_root: PathBuf,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Hide the progress spinner and the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

impl LocalizeCommand {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            input: self.input.clone(),
            source_url: self.source_url.clone(),
            output_root: self.output_root.clone(),
            fetch: FetchConfig {
                user_agent: self.user_agent.clone(),
                skip_errors: self.skip_errors,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let args = LocalizeCommand::try_parse_from(&["page-localizer", "page.html"]).unwrap();

        assert_eq!(args.input, PathBuf::from("page.html"));
        assert_eq!(args.source_url, None);
        assert_eq!(args.skip_errors, false);
        assert_eq!(args.output_root, PathBuf::from("."));
        assert_eq!(args.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(args.quiet, false);
    }

    #[test]
    fn test_parse_all_args() {
        let args = LocalizeCommand::try_parse_from(&[
            "page-localizer",
            "saved/page.html",
            "https://example.com/blog/post/",
            "--skip-errors",
            "-o", "./mirror",
            "--user-agent", "TestAgent/1.0",
            "-q",
        ])
        .unwrap();

        assert_eq!(args.input, PathBuf::from("saved/page.html"));
        assert_eq!(args.source_url.as_deref(), Some("https://example.com/blog/post/"));
        assert_eq!(args.skip_errors, true);
        assert_eq!(args.output_root, PathBuf::from("./mirror"));
        assert_eq!(args.user_agent, "TestAgent/1.0");
        assert_eq!(args.quiet, true);
    }

    #[test]
    fn test_short_skip_errors() {
        let args = LocalizeCommand::try_parse_from(&["page-localizer", "page.html", "-k"]).unwrap();
        assert!(args.skip_errors);
    }

    #[test]
    fn test_parse_missing_input() {
        let result = LocalizeCommand::try_parse_from(&["page-localizer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_usage_errors_have_their_own_exit_code() {
        use crate::error::LocalizeError;

        let err = LocalizeCommand::try_parse_from(&["page-localizer"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), USAGE_EXIT_CODE);

        let url_error = LocalizeError::invalid_url("::", "relative URL without a base");
        assert_ne!(usage_exit_code(&err), url_error.exit_code());

        let help = LocalizeCommand::try_parse_from(&["page-localizer", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&help), 0);
    }

    #[test]
    fn test_parse_too_many_positionals() {
        let result = LocalizeCommand::try_parse_from(&[
            "page-localizer",
            "page.html",
            "https://example.com/",
            "extra",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_config() {
        let args = LocalizeCommand::try_parse_from(&[
            "page-localizer",
            "page.html",
            "https://example.com/",
            "-k",
        ])
        .unwrap();
        let config = args.pipeline_config();

        assert_eq!(config.input, PathBuf::from("page.html"));
        assert_eq!(config.source_url.as_deref(), Some("https://example.com/"));
        assert!(config.fetch.skip_errors);
        assert_eq!(config.fetch.user_agent, DEFAULT_USER_AGENT);
    }
}
