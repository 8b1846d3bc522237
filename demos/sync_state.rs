use municipal_climate::{total_bounds, ClimateAtlas, ClimateAtlasError, MunicipalitySelection};
use std::env;

#[tokio::main]
async fn main() -> Result<(), ClimateAtlasError> {
    // RUST_LOG=info shows download progress
    env_logger::init();
    let state = env::args().nth(1).unwrap_or_else(|| "SP".to_string());

    let atlas = ClimateAtlas::builder().state(state).build().await?;
    println!(
        "{} municipalities in {}",
        atlas.municipalities().await?.len(),
        atlas.state()
    );

    let series = atlas.sync().await?;
    println!("{} daily rows stored at {}", series.len(), atlas.store().path().display());
    if let Some(bounds) = atlas.date_bounds().await? {
        println!("Covering {}", bounds);
    }

    let summary = atlas.summary().call().await?;
    println!("{:#?}", summary);

    let options = atlas.selection_options().await?;
    let first = options
        .iter()
        .find(|option| !option.is_all())
        .cloned()
        .unwrap_or(MunicipalitySelection::All);
    for row in atlas.monthly().selection(first.clone()).call().await? {
        println!(
            "{} {}-{:02}: {:>7.1} mm, avg {:?} °C",
            first, row.year, row.month, row.precipitation, row.temp_avg
        );
    }

    if let Some(rect) = total_bounds(&atlas.boundaries().await?) {
        println!("Map extent: {:?} to {:?}", rect.min(), rect.max());
    }

    Ok(())
}
