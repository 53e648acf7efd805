use crate::render;
use crate::{Command, PreferencesAction};
use anyhow::{bail, Context};
use recodash_core::api::http::HttpDashboardApi;
use recodash_core::api::{DashboardApi, ErrorContext};
use recodash_core::cache::{QueryCache, RetryPolicy};
use recodash_core::config::Settings;
use recodash_core::domain::params::RecommendationQueryParams;
use recodash_core::domain::preferences::PreferencesUpdate;
use recodash_core::query::search::MIN_QUERY_LEN;
use recodash_core::query::{QueryClient, QueryOptions};
use recodash_core::validation::RegistrationForm;
use std::sync::Arc;

pub async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    let http = HttpDashboardApi::from_settings(settings)?;

    match command {
        Command::Login { email, password } => {
            let res = http
                .login(&email, &password)
                .await
                .map_err(|e| render::failure(&e, ErrorContext::Login))?;
            println!("Logged in. Export the token to use it:");
            println!("export RECODASH_API_TOKEN={}", res.access_token);
            Ok(())
        }
        Command::Register {
            email,
            password,
            confirm_password,
        } => {
            let form = RegistrationForm {
                email,
                password,
                confirm_password,
            };
            let user = http
                .register(&form)
                .await
                .map_err(|e| render::failure(&e, ErrorContext::Registration))?;
            println!("Account created for {}. You can now log in.", user.email);
            Ok(())
        }
        other => {
            settings.require_api_token()?;
            let client = query_client(http);
            run_authenticated(other, &client).await
        }
    }
}

fn query_client(http: HttpDashboardApi) -> QueryClient {
    let api: Arc<dyn DashboardApi> = Arc::new(http);
    QueryClient::new(
        api,
        QueryCache::new(RetryPolicy::from_env()),
        QueryOptions::from_env(),
    )
}

async fn run_authenticated(command: Command, client: &QueryClient) -> anyhow::Result<()> {
    match command {
        Command::Recommendations {
            holding_period,
            risk_level,
            confidence_min,
            sort_by,
            sort_direction,
            watch,
        } => {
            let params = RecommendationQueryParams {
                holding_period,
                risk_level,
                confidence_min,
                sort_by,
                sort_direction,
            };
            params.validate()?;
            let params = (!params.is_empty()).then_some(params);
            recommendations(client, params, watch).await
        }
        Command::Recommendation { id } => {
            let mut query = client.recommendation(id);
            render::recommendation(query.load().await)
        }
        Command::Search { query } => {
            if query.trim().chars().count() < MIN_QUERY_LEN {
                println!("Type at least {MIN_QUERY_LEN} characters to search.");
                return Ok(());
            }
            let mut search = client.search();
            search.set_query(&query);
            render::search_results(search.settle().await)
        }
        Command::Stock { id } => {
            let mut query = client.stock(id);
            render::stock(query.load().await)
        }
        Command::Track { id } => {
            let mut tier = client.tier_status();
            if tier.load().await.is_limit_reached {
                bail!("Free tier limit reached. Upgrade to premium to track more stocks.");
            }
            let res = client
                .mutations()
                .track_stock(id)
                .await
                .map_err(|e| render::failure(&e, ErrorContext::Tracking))?;
            println!("{}", res.message);
            render::tier(&tier.load().await);
            Ok(())
        }
        Command::Untrack { id } => {
            let res = client
                .mutations()
                .untrack_stock(id)
                .await
                .map_err(|e| render::failure(&e, ErrorContext::Tracking))?;
            println!("{}", res.message);
            Ok(())
        }
        Command::Preferences { action } => match action {
            PreferencesAction::Show => {
                let mut query = client.preferences();
                render::preferences(query.load().await)
            }
            PreferencesAction::Set {
                holding_period,
                risk_tolerance,
            } => {
                let update = PreferencesUpdate {
                    holding_period,
                    risk_tolerance,
                };
                if update.is_empty() {
                    bail!("pass --holding-period and/or --risk-tolerance");
                }
                let saved = client
                    .mutations()
                    .save_preferences(update)
                    .await
                    .map_err(|e| render::failure(&e, ErrorContext::Preferences))?;
                println!("Preferences saved.");
                render::saved_preferences(&saved);
                Ok(())
            }
        },
        Command::Tier => {
            let mut query = client.tier_status();
            let view = query.load().await;
            if let Some(err) = &query.state().error {
                return Err(render::failure(err, ErrorContext::TierStatus));
            }
            render::tier(&view);
            Ok(())
        }
        Command::Login { .. } | Command::Register { .. } => {
            unreachable!("handled before authentication")
        }
    }
}

async fn recommendations(
    client: &QueryClient,
    params: Option<RecommendationQueryParams>,
    watch: bool,
) -> anyhow::Result<()> {
    let mut query = client.recommendations(params);
    let first = render::recommendations(query.load().await);
    if !watch {
        return first;
    }
    if let Err(err) = first {
        eprintln!("{err}");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("failed to listen for ctrl-c")?;
                tracing::info!("watch stopped");
                return Ok(());
            }
            state = query.next_change() => {
                println!();
                if let Err(err) = render::recommendations(state) {
                    eprintln!("{err}");
                }
            }
        }
    }
}
