use lumiere::logger::{self, LoggerConfig};
use lumiere::{Config, ImageModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env();
    let logger_config = if config.json_logs {
        LoggerConfig::production()
    } else {
        LoggerConfig::development()
    };
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    logger::log_config_info(&config);

    log::info!("🖼️  Available image generation models:");
    for (id, name, provider) in ImageModel::supported_models() {
        log::info!("  {} - {} ({})", id, name, provider);
    }

    run(config).await
}

#[cfg(feature = "server")]
async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    lumiere::server::run(config).await?;
    Ok(())
}

/// Without the web surface: `lumiere [model] [prompt...]`, one generation, URLs on stdout.
#[cfg(not(feature = "server"))]
async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    use lumiere::{apply_form, Dispatcher, FormInput, SessionState};

    let mut args = std::env::args().skip(1);
    let model = args.next();
    let prompt: Vec<String> = args.collect();

    let mut state = SessionState::new();
    let input = FormInput {
        model,
        prompt: if prompt.is_empty() {
            None
        } else {
            Some(prompt.join(" "))
        },
        ..Default::default()
    };
    apply_form(&mut state, &input)?;

    let dispatcher = Dispatcher::new(&config);
    let task = dispatcher.spawn(state);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut phases = task.subscribe();

    // Cancel on Ctrl-C, otherwise wait for the attempt to finish.
    while !phases.borrow_and_update().is_terminal() {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::warn!("Interrupted, cancelling generation");
                task.cancel();
                break;
            }
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    match task.join().await {
        Ok(result) => {
            for url in &result.images {
                println!("{}", url);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}
