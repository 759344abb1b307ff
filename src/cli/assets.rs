use super::ui;
use crate::core::{AssetSymbol, Category};
use crate::resolver::PriceResolver;
use anyhow::Result;
use comfy_table::Cell;

/// Renders assets grouped by category, precious metals first. Within a
/// category the provider order is kept.
pub fn display_as_table(assets: &[AssetSymbol]) -> String {
    let mut rows: Vec<(Category, &AssetSymbol)> = assets
        .iter()
        .map(|asset| (Category::of(&asset.symbol), asset))
        .collect();
    rows.sort_by_key(|(category, _)| *category);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Category"),
    ]);
    for (category, asset) in rows {
        table.add_row(vec![
            Cell::new(&asset.symbol),
            Cell::new(&asset.name),
            Cell::new(category.to_string()),
        ]);
    }

    format!(
        "{}\n\n{}\n{}",
        ui::style_text("Supported Assets", ui::StyleType::Title),
        table,
        ui::style_text(
            &format!("{} assets", assets.len()),
            ui::StyleType::Subtle
        )
    )
}

pub async fn run(resolver: &PriceResolver) -> Result<()> {
    let pb = ui::new_spinner("Fetching supported assets...");
    let assets = resolver.list_assets().await;
    pb.finish_and_clear();

    if assets.is_empty() {
        anyhow::bail!("No supported assets found. Providers might be temporarily unavailable.");
    }

    println!("{}", display_as_table(&assets));
    Ok(())
}
