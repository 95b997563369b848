// Configuration for the demo agent

use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory holding the canned `.wav` assets.
    pub audio_dir: PathBuf,
    /// Scripted line spoken when the agent joins the call.
    pub greeting: String,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let audio_dir = std::env::var("AUDIO_DIR")
            .context("AUDIO_DIR must point at the canned audio directory")?
            .into();

        let greeting = std::env::var("AGENT_GREETING")
            .unwrap_or_else(|_| "Hey, how can I help you today?".to_string());

        Ok(Self {
            audio_dir,
            greeting,
        })
    }
}
