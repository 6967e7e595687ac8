use crsgrid::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const REGISTRY: &str = r#"{
    "plate": { "crs": { "type": "EPSG:4326" }, "start_zoom": 2 },
    "arctic": {
        "crs": {
            "type": "custom",
            "code": "ARCTIC:1",
            "projection": "lon_lat",
            "resolutions": [0.703125, 0.3515625, 0.17578125, 0.087890625, 0.0439453125],
            "origin": [-180, 90],
            "bounds": [-180, -90, 180, 90],
            "wrap_lng": [-180, 180]
        },
        "start_zoom": 4
    }
}"#;

/// Pretends every queued tile arrived
fn load_all<S: RenderSurface>(grid: &mut TileGridController<S>, view: &Viewport) {
    for coords in grid.tile_coords() {
        if grid.tile(&coords).is_some_and(|tile| !tile.loaded) {
            grid.tile_ready(view, &coords, None);
        }
    }
}

fn report<S: RenderSurface>(name: &str, grid: &TileGridController<S>) {
    match grid.current_level().filter(|_| grid.tile_zoom().is_some()) {
        Some(level) => println!(
            "   {name:<8} tile zoom {:>2} | {:>3} tiles | {} levels | scale {:.3} translate ({:.0}, {:.0})",
            level.zoom,
            grid.tile_count(),
            grid.levels().len(),
            level.scale,
            level.translate.x,
            level.translate.y
        ),
        None => println!("   {name:<8} inactive at this zoom"),
    }
}

/// Drives a map with three CRSs through a few views without any UI
fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("🗺️ crsgrid headless example");
    println!("===========================");

    let registry = CrsRegistry::from_json(REGISTRY)?;
    println!("✅ Registered CRSs: {:?}", registry.names());

    let options = MapOptions::default().with_custom_crs(registry);
    let mut map_events = EventManager::new();
    let mut view = Viewport::with_view(
        options,
        Point::new(1024.0, 768.0),
        LatLng::new(64.1466, -21.9426), // Reykjavík
        1.0,
        &mut map_events,
    )?;

    let mut base = TileGridController::new(GridLayerOptions::default(), HeadlessSurface::new());
    let mut plate = TileGridController::new(
        GridLayerOptions::default().with_custom_crs("plate"),
        HeadlessSurface::new(),
    );
    let mut arctic = TileGridController::new(
        GridLayerOptions::default().with_custom_crs("arctic"),
        HeadlessSurface::new(),
    );

    let loaded = std::sync::Arc::new(AtomicUsize::new(0));
    let counter = loaded.clone();
    arctic.events_mut().on("tileload", move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    base.on_add(&view)?;
    plate.on_add(&view)?;
    arctic.on_add(&view)?;

    println!("\n🔍 Zooming in:");
    for zoom in [1.0, 2.0, 3.5, 4.0, 5.0, 6.2] {
        view.set_view(view.center, zoom, &mut map_events)?;
        println!("📍 zoom {zoom}");
        for (name, grid) in [("base", &mut base), ("plate", &mut plate), ("arctic", &mut arctic)] {
            grid.reset_view(&view, false)?;
            load_all(grid, &view);
            report(name, grid);
        }
    }

    println!("\n🚀 Panning east:");
    for step in 1..=3 {
        let center = LatLng::new(view.center.lat, view.center.lng + 2.0 * step as f64);
        view.set_view(center, view.zoom, &mut map_events)?;
        for (name, grid) in [("base", &mut base), ("plate", &mut plate), ("arctic", &mut arctic)] {
            grid.on_move_end(&view)?;
            load_all(grid, &view);
            report(name, grid);
        }
    }

    let arctic_events = arctic.events_mut().process_events();
    println!(
        "\n✅ arctic layer: {} tileload callbacks, {} events in total",
        loaded.load(Ordering::Relaxed),
        arctic_events.len()
    );
    println!("✅ map fired {} events", map_events.process_events().len());

    base.on_remove();
    plate.on_remove();
    arctic.on_remove();
    println!("✅ layers removed, base surface holds {} tiles", base.surface().tile_count());
    Ok(())
}
