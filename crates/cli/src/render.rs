use recodash_core::api::{ApiError, ErrorContext};
use recodash_core::domain::preferences::UserPreferences;
use recodash_core::domain::recommendation::{Recommendation, StockSearch};
use recodash_core::format;
use recodash_core::query::tier::TierView;
use recodash_core::query::{QueryState, View};

/// Turns a failed query into a command error carrying the user-facing
/// message; the underlying `ApiError` stays in the chain for logging.
pub fn failure(err: &ApiError, ctx: ErrorContext) -> anyhow::Error {
    anyhow::Error::new(err.clone()).context(err.user_message(ctx))
}

pub fn recommendations(state: &QueryState<Vec<Recommendation>>) -> anyhow::Result<()> {
    match state.view() {
        View::Loading => println!("Loading recommendations..."),
        View::Error(err) => return Err(failure(err, ErrorContext::Recommendations)),
        View::Empty => println!("No recommendations match these filters."),
        View::Populated(recs) => {
            println!(
                "{:<8} {:<5} {:>5}  {:<11} {:<9} {}",
                "SYMBOL", "SIG", "CONF", "RISK", "SENTIMENT", "CREATED"
            );
            for rec in recs {
                println!(
                    "{:<8} {:<5} {:>5}  {:<11} {:<9} {}",
                    rec.stock.symbol,
                    format::signal_label(rec.signal),
                    format::confidence_percent(rec.confidence_score),
                    format::risk_label(rec.risk_level),
                    format::sentiment_label(rec.sentiment_score),
                    format::timestamp(rec.created_at),
                );
            }
        }
    }
    Ok(())
}

pub fn recommendation(state: &QueryState<Option<Recommendation>>) -> anyhow::Result<()> {
    match state.view() {
        View::Loading => println!("Loading recommendation..."),
        View::Error(err) => return Err(failure(err, ErrorContext::RecommendationDetail)),
        View::Empty => println!("Recommendation not found."),
        View::Populated(rec) => {
            println!("{} ({})", rec.stock.company_name, rec.stock.symbol);
            if let Some(sector) = &rec.stock.sector {
                println!("  Sector:     {sector}");
            }
            println!("  Signal:     {}", format::signal_label(rec.signal));
            println!("  Confidence: {}", format::confidence_percent(rec.confidence_score));
            println!("  Risk:       {}", format::risk_label(rec.risk_level));
            println!("  Sentiment:  {}", format::sentiment_label(rec.sentiment_score));
            println!("  Created:    {}", format::timestamp(rec.created_at));
            if let Some(explanation) = &rec.explanation {
                println!();
                println!("{explanation}");
            }
        }
    }
    Ok(())
}

pub fn search_results(state: &QueryState<Vec<StockSearch>>) -> anyhow::Result<()> {
    match state.view() {
        View::Loading => println!("Searching..."),
        View::Error(err) => return Err(failure(err, ErrorContext::Search)),
        View::Empty => println!("No stocks found."),
        View::Populated(stocks) => {
            for stock in stocks {
                stock_line(stock);
            }
        }
    }
    Ok(())
}

pub fn stock(state: &QueryState<Option<StockSearch>>) -> anyhow::Result<()> {
    match state.view() {
        View::Loading => println!("Loading stock..."),
        View::Error(err) => return Err(failure(err, ErrorContext::StockDetail)),
        View::Empty => println!("Stock not found."),
        View::Populated(stock) => {
            stock_line(stock);
            println!("  id: {}", stock.id);
        }
    }
    Ok(())
}

fn stock_line(stock: &StockSearch) {
    let mut flags = Vec::new();
    if stock.is_tracked {
        flags.push("tracked");
    }
    if stock.has_recommendation {
        flags.push("recommended");
    }
    let sector = stock.sector.as_deref().unwrap_or("-");
    if flags.is_empty() {
        println!("{:<8} {:<40} {}", stock.symbol, stock.company_name, sector);
    } else {
        println!(
            "{:<8} {:<40} {} [{}]",
            stock.symbol,
            stock.company_name,
            sector,
            flags.join(", ")
        );
    }
}

pub fn preferences(state: &QueryState<Option<UserPreferences>>) -> anyhow::Result<()> {
    match state.view() {
        View::Loading => println!("Loading preferences..."),
        View::Error(err) => return Err(failure(err, ErrorContext::Preferences)),
        View::Empty => println!("No preferences saved yet."),
        View::Populated(prefs) => saved_preferences(prefs),
    }
    Ok(())
}

pub fn saved_preferences(prefs: &UserPreferences) {
    println!(
        "Holding period: {}",
        format::holding_period_label(prefs.holding_period)
    );
    println!("Risk tolerance: {}", format::risk_label(prefs.risk_tolerance));
}

pub fn tier(view: &TierView) {
    println!("Plan:     {}", view.tier);
    println!(
        "Tracking: {}",
        format::tracking_usage(view.stock_count, view.stock_limit)
    );
    if view.is_limit_reached {
        println!("You have reached the free tier limit. Upgrade to premium to track more stocks.");
    }
}
