// Formatting codes for console output
pub const FORMAT_RESET: &str = "\x1b[0m";
pub const FORMAT_BOLD: &str = "\x1b[1m";
pub const FORMAT_RED: &str = "\x1b[31m";
pub const FORMAT_YELLOW: &str = "\x1b[33m";

/// Marker that generator transports embed in text responses to signal failure
pub const ERROR_MARKER: &str = "⚠️ Error:";

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variables read by [`crate::config::Config::from_env`]
pub const ENV_API_KEYS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];
pub const ENV_MODEL: &str = "RESEARCH_AGENT_MODEL";
pub const ENV_OUTPUT_DIR: &str = "RESEARCH_AGENT_OUTPUT_DIR";
pub const ENV_LOG: &str = "RESEARCH_AGENT_LOG";

// Help shown by the interactive front-end
pub const HELP_TEMPLATE: &str = r#"
# research-agent Help

## Commands
  approve | a            - Approve the current idea, summary or properties
  reject  | r            - Reject and move on (next idea / regenerate)
  retry                  - Re-run generation for the current stage
  export                 - Save the current summary or proposal as PDF
  show                   - Print the current session snapshot as JSON
  new                    - Discard everything and start a new research run
  help                   - Display this help
  quit | exit            - Leave the program

## Stages
  1. Provide research details (topic, goal, existing data)
  2. Review generated research ideas one by one
  3. Review the literature summary for the approved idea
  4. Review predicted properties / experimental approach
  5. Read the compiled proposal overview (NSDB)
"#;
