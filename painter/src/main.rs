use std::sync::Arc;

use common::ChunkRect;
use painter::api::ApiClient;
use painter::notify::{self, Operator, TerminalBell};
use painter::{connection, dispatcher, quantize, seed, Config, Placer, Session};

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            let _ = ctrl_c.await;
            return;
        }
    };
    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("painter=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let api = ApiClient::new(&config.base_url, config.proxy.as_deref())?;

    tracing::info!("Requesting canvas data from {}", config.base_url);
    let canvas = api.me().await?.canvas(config.canvas)?;
    let target = quantize::load_target(&config.image, canvas.palette())?;
    let rect = ChunkRect::covering(&canvas, config.x, config.y, target.width(), target.height())?;

    let session_token = match (&config.session, &config.credentials) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(credentials)) => {
            let token = api.login(credentials).await?;
            if token.is_none() {
                tracing::warn!("Authorization failed, continuing anonymously");
            }
            token
        }
        (None, None) => None,
    };

    let cache = seed::seed_cache(&api, &canvas, rect).await?;
    let canvas_id = canvas.id();
    let session = Session::new(canvas, cache);

    let (mut sink, frames) = connection::connect(
        &config.ws_url,
        &config.base_url,
        session_token.as_deref(),
        config.proxy.as_deref(),
    )
    .await?;
    connection::announce(&mut sink, canvas_id, &rect).await?;
    let (outbound, writer) = connection::spawn_writer(sink);
    let receiver = tokio::spawn(dispatcher::run(frames, session.clone()));

    let (resume_tx, resume_rx) = notify::resume_channel();
    tokio::spawn(notify::forward_stdin(resume_tx));

    let mut placer = Placer::new(
        session,
        outbound,
        Arc::new(target),
        (config.x, config.y),
        Operator::new(Arc::new(TerminalBell), resume_rx),
        config.pacing,
    );
    let (strategy, defend) = (config.strategy, config.defend);
    let driver = async move {
        placer.run_pass(strategy).await?;
        if defend {
            placer.defend().await?;
        }
        Ok::<_, painter::PainterError>(())
    };

    tokio::select! {
        result = driver => result?,
        result = receiver => result??,
        result = writer => result??,
        _ = shutdown_signal() => {}
    }

    tracing::info!("Painter stopped.");
    Ok(())
}
