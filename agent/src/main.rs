mod config;

use futures_util::StreamExt;
use tracing::info;

use tts_core::CannedTts;

use crate::config::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    let config = AgentConfig::from_env()?;
    info!(audio_dir = %config.audio_dir.display(), "starting demo agent");

    let tts = CannedTts::new(&config.audio_dir);
    let _metrics = tts.on_metrics(|m| {
        let payload = serde_json::to_string(m).unwrap_or_default();
        info!(metrics = %payload, "metrics collected");
    });

    // Scripted turn: the greeting arrives in fragments, the way a live
    // language-model response would.
    let session = tts.stream();
    for fragment in config.greeting.split_inclusive(' ') {
        session.push_text(fragment);
    }
    session.end_input();

    let frames = session.frames();
    tokio::pin!(frames);

    let mut frame_count = 0u64;
    let mut samples = 0u64;
    while let Some(frame) = frames.next().await {
        frame_count += 1;
        samples += frame.samples_per_channel as u64;
    }

    info!(
        frame_count,
        samples,
        sample_rate = tts.get_sample_rate(),
        "playback finished"
    );

    tts.close();
    Ok(())
}
