use super::ui;
use crate::resolver::PriceResolver;
use crate::tools;
use anyhow::Result;

pub async fn run(resolver: &PriceResolver, symbol: Option<&str>, currency: &str) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let output = tools::get_asset_price(resolver, symbol, currency).await;
    pb.finish_and_clear();

    if output.is_error {
        anyhow::bail!("{}", ui::style_text(&output.text, ui::StyleType::Error));
    }

    println!("{}", output.text);
    Ok(())
}
