//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use clap::Parser;
use freecity_server::agent::CharacterAgent;
use freecity_server::config::{Arguments, Configuration, PipelineRole};
use freecity_server::director::WorldDirector;
use freecity_server::dispatch::DispatchCoordinator;
use freecity_server::llm::LlmManager;
use freecity_server::postprocess::StageDirectionFilter;
use freecity_server::tick::{NarrativeEngine, TickRequest};
use freecity_server::triggers::TriggerEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        // Try default .env file
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = if std::path::Path::new(&arguments.config_file).exists() {
        Configuration::load(&arguments.config_file)?
    } else {
        tracing::warn!(
            "Configuration file {} not found, using defaults",
            arguments.config_file
        );
        Configuration::default()
    };
    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting Freecity narrative engine...");

    // Resolve both model gateways; missing credentials are fatal here
    let director_gateway = config.director.resolve(PipelineRole::Director)?;
    let agent_gateway = config.agent.resolve(PipelineRole::Agent)?;
    tracing::info!(
        "Director uses {} ({}), agents use {} ({})",
        director_gateway.llm.provider,
        director_gateway.options.model,
        agent_gateway.llm.provider,
        agent_gateway.options.model
    );

    let manager = LlmManager::new();
    manager
        .register_provider("director", director_gateway.llm)
        .await?;
    manager.register_provider("agent", agent_gateway.llm).await?;

    let director = WorldDirector::new(Arc::new(
        manager
            .gateway("director", director_gateway.options)
            .await?,
    ));
    let agent = CharacterAgent::new(
        Arc::new(manager.gateway("agent", agent_gateway.options).await?),
        Arc::new(TriggerEngine::new(config.triggers.clone())),
    );
    let dispatcher = DispatchCoordinator::new(Arc::new(agent), config.dispatch.max_concurrency)
        .with_filter(Arc::new(StageDirectionFilter));
    let engine = NarrativeEngine::new(director, dispatcher);

    // Read the scenario to tick
    tracing::info!("Reading scenario from {}", arguments.scenario);
    let scenario = std::fs::read_to_string(&arguments.scenario)?;
    let request: TickRequest = serde_json::from_str(&scenario)?;

    // Run one tick; Ctrl-C cancels it along with every agent run it started
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling tick");
            interrupt.cancel();
        }
    });

    let outcome = engine.tick(request, &cancel).await?;
    tracing::info!(
        "Tick finished with status {} after {} retries",
        outcome.validation_status,
        outcome.retry_count
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
