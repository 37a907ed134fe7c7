//! Platform guidance lookup.
//!
//! Guidance sits behind [`ContextSource`] so a remote lookup can replace the
//! static table. A failing source never aborts a job: [`retrieve_context`]
//! logs and returns the plan unchanged.

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::planner::Plan;
use crate::core::spec::Platform;

/// Prefix of the note appended to the plan.
pub const GUIDE_NOTE_PREFIX: &str = "Platform guide: ";

pub trait ContextSource: Send + Sync {
    /// Guidance text for `platform`, or `None` when nothing is known.
    fn guidance(&self, platform: Platform) -> Result<Option<String>>;
}

/// Built-in guidance table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticGuides;

impl ContextSource for StaticGuides {
    fn guidance(&self, platform: Platform) -> Result<Option<String>> {
        let text = platform_guide(platform);
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

pub fn platform_guide(platform: Platform) -> &'static str {
    match platform {
        Platform::Telegram => {
            "Build on python-telegram-bot's Application with async handlers. Register CommandHandler \
             for /start and /help and a MessageHandler for text. Read TELEGRAM_BOT_TOKEN from the \
             environment and call run_polling()."
        }
        Platform::Discord => {
            "Use discord.ext.commands.Bot with explicit Intents and enable message_content when \
             reading messages. Register commands with @bot.command(). Read DISCORD_TOKEN from the \
             environment and start with bot.run()."
        }
        Platform::Slack => {
            "Use slack_bolt App with SocketModeHandler for local runs. Listen with @app.message and \
             @app.command. Read SLACK_BOT_TOKEN and SLACK_APP_TOKEN from the environment."
        }
        Platform::Cli => {
            "Use click groups and commands with typed options. Keep side effects in the handler \
             module so commands stay thin, and exit non-zero on errors."
        }
        Platform::WebApi => {
            "Use FastAPI with pydantic request models and serve with uvicorn. Expose a /health \
             endpoint and keep route handlers thin by delegating to the handler module."
        }
        Platform::Custom => {
            "Plain Python entry point. Keep configuration in config.py, logic in bot/handler.py, \
             and read secrets from environment variables."
        }
    }
}

/// Append platform guidance to `plan`. Any source failure degrades to a no-op.
pub fn retrieve_context(mut plan: Plan, source: &dyn ContextSource) -> Plan {
    let platform = plan.spec.platform;
    match source.guidance(platform) {
        Ok(Some(text)) if !text.trim().is_empty() => {
            debug!(%platform, "attached platform guide");
            plan.add_note(format!("{GUIDE_NOTE_PREFIX}{}", text.trim()));
        }
        Ok(_) => debug!(%platform, "no platform guide"),
        Err(err) => warn!(%platform, err = %format!("{err:#}"), "context lookup failed, continuing without guide"),
    }
    plan
}
