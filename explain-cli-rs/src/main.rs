// explain-cli-rs/src/main.rs
// Command-line front end for the explain pipeline

use std::fs;

use anyhow::{bail, Context};
use clap::Parser;
use dotenv::dotenv;
use log::{debug, info};
use serde_json::json;

use explain_sdk::config::{CompositeConfigProvider, EnvConfigProvider, MemoryConfigProvider};
use explain_sdk::explain::{parse_with_tier, DEFAULT_PLAN};
use explain_sdk::gemini::GeminiClient;
use explain_sdk::{ExplainRequest, ExplainerSettings, FallbackClient, ImagePayload, Language};

mod cli;
use cli::{Cli, Commands, ExplainArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Plan) => {
            print_plan();
            Ok(())
        }
        None => explain(cli.explain).await,
    }
}

fn print_plan() {
    for (i, attempt) in DEFAULT_PLAN.iter().enumerate() {
        let input = if attempt.uses_image { "image + text" } else { "text only" };
        println!("{}. {} ({})", i + 1, attempt.model_id, input);
    }
}

async fn explain(args: ExplainArgs) -> anyhow::Result<()> {
    let Some(target) = args.target.clone() else {
        bail!("--target is required");
    };

    let mut overrides = MemoryConfigProvider::new();
    if let Some(timeout) = args.timeout {
        overrides.set("gemini_attempt_timeout_seconds", timeout);
    }
    if let Some(ref base_url) = args.base_url {
        overrides.set("gemini_base_url", base_url);
    }
    if let Some(ref language) = args.language {
        overrides.set("explainer_language", language);
    }

    let provider = CompositeConfigProvider::new()
        .layer(overrides)
        .layer(EnvConfigProvider::new());

    let settings = ExplainerSettings::from_provider(&provider).context("invalid explainer settings")?;
    let client = GeminiClient::from_provider(&provider).context("invalid Gemini configuration")?;
    let fallback = FallbackClient::gemini(client);

    let image = load_image(&args)?;
    let language: Language = settings.default_language;
    debug!("language {} (speech locale {})", language, language.locale());

    let request = ExplainRequest::new(target.as_str(), args.context.as_str(), image, language.clone())?;
    let outcome = fallback.run(&request).await;
    let (result, tier) = parse_with_tier(&outcome.text, &target);

    match &outcome.answered_by {
        Some(model) => info!("answered by {} ({} calls)", model, outcome.attempts.len()),
        None => info!("no model answered ({} calls)", outcome.attempts.len()),
    }

    if args.json {
        let attempts: Vec<_> = outcome
            .attempts
            .iter()
            .map(|a| {
                json!({
                    "model": a.model_id,
                    "with_image": a.with_image,
                    "failure": a.failure.map(|f| f.to_string()),
                    "error": a.error,
                })
            })
            .collect();

        let output = json!({
            "part_name": result.part_name,
            "description": result.description,
            "parse": format!("{:?}", tier),
            "answered_by": outcome.answered_by,
            "language": language.as_str(),
            "locale": language.locale(),
            "attempts": attempts,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", result.part_name);
        println!();
        println!("{}", result.description);
        println!();
        println!("speech locale: {}", language.locale());
    }

    Ok(())
}

fn load_image(args: &ExplainArgs) -> anyhow::Result<Option<ImagePayload>> {
    if let Some(ref uri) = args.image_uri {
        return Ok(Some(ImagePayload::from_data_uri(uri)?));
    }

    let Some(ref path) = args.image else {
        return Ok(None);
    };

    let data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    if data.is_empty() {
        bail!("{} is empty", path.display());
    }

    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));

    Ok(Some(if is_png {
        ImagePayload {
            mime_type: "image/png".to_string(),
            data,
        }
    } else {
        ImagePayload::jpeg(data)
    }))
}
