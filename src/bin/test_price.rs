// src/bin/test_price.rs
use dotenv::dotenv;
use log::{error, info};
use valuation_dashboard::config::AppConfig;
use valuation_dashboard::services::price_probe::{PriceProbe, QuotePageProbe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let tickers: Vec<String> = std::env::args().skip(1).collect();
    if tickers.is_empty() {
        anyhow::bail!("usage: test_price <ticker> [<ticker>...]");
    }

    let config = AppConfig::from_env()?;
    let probe = QuotePageProbe::new(config.quote_page_url.clone(), config.price_timeout)?;
    info!("Testing live prices from {}", config.quote_page_url);

    let mut missing = 0;
    for ticker in &tickers {
        match probe.fetch_price(ticker).await {
            Some(price) => info!("SUCCESS: {} trades at {}", ticker, price),
            None => {
                error!("ERROR: no live price for {}", ticker);
                missing += 1;
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{} of {} tickers had no live price", missing, tickers.len());
    }
    Ok(())
}
