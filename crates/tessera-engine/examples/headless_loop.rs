//! Headless simulation: a bouncing particle field driven by the runner.
//!
//! Tags pick the active systems. Pass `--render` to switch on the `render`
//! tag (a text "renderer" prints the particle positions), otherwise only the
//! simulation runs. The `quit` system stops the world after two simulated
//! seconds.
//!
//! Run with: `RUST_LOG=tessera_engine=debug cargo run --example headless_loop -- --render`

use anyhow::Context;
use tessera_engine::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, catalog: &mut CatalogBuilder) -> Result<(), EngineError> {
        catalog
            .component(ComponentOps::<Position>::full("Position"))
            .component(ComponentOps::<Velocity>::full("Velocity"))
            .system(SystemDescriptor::fixed("sim.spawn", |world| {
                for i in 0..4 {
                    let e = world.spawn();
                    let f = i as f32;
                    world
                        .insert(e, Position { x: f, y: 0.0 })
                        .expect("freshly spawned entity is alive");
                    world
                        .insert(e, Velocity { dx: 1.0 + f, dy: 2.0 })
                        .expect("freshly spawned entity is alive");
                }
                Box::new(|_w: &mut World, _dt: f32| {})
            }))
            .system(
                SystemDescriptor::fixed("sim.integrate", |_w| {
                    Box::new(|world: &mut World, dt: f32| {
                        let moves: Vec<_> = world
                            .entities()
                            .iter::<Velocity>()
                            .map(|(e, v)| (e, *v))
                            .collect();
                        for (e, v) in moves {
                            if let Some(p) = world.get_mut::<Position>(e) {
                                p.x += v.dx * dt;
                                p.y += v.dy * dt;
                            }
                        }
                    })
                })
                .after("sim.spawn"),
            )
            .system(
                SystemDescriptor::fixed("sim.bounce", |_w| {
                    Box::new(|world: &mut World, _dt: f32| {
                        let entities: Vec<_> = world.entities().entities().collect();
                        for e in entities {
                            let out = world
                                .get::<Position>(e)
                                .map(|p| (p.x.abs() > 10.0, p.y.abs() > 10.0));
                            if let (Some((flip_x, flip_y)), Some(v)) = (out, world.get_mut::<Velocity>(e)) {
                                if flip_x {
                                    v.dx = -v.dx;
                                }
                                if flip_y {
                                    v.dy = -v.dy;
                                }
                            }
                        }
                    })
                })
                .after("sim.integrate"),
            )
            .system(SystemDescriptor::normal("quit", |_w| {
                let mut elapsed = 0.0;
                Box::new(move |world: &mut World, dt: f32| {
                    elapsed += dt;
                    if elapsed >= 2.0 {
                        world.request_stop();
                    }
                })
            }));
        Ok(())
    }
}

struct TextRenderPlugin;

impl Plugin for TextRenderPlugin {
    fn build(&self, catalog: &mut CatalogBuilder) -> Result<(), EngineError> {
        let render = catalog.tag("render")?;
        catalog.system(
            SystemDescriptor::normal("render.print", |_w| {
                let mut frame = 0u64;
                Box::new(move |world: &mut World, _dt: f32| {
                    frame += 1;
                    if frame % 30 != 0 {
                        return;
                    }
                    for (e, p) in world.entities().iter::<Position>() {
                        println!("frame {frame:4} {e}: ({:6.2}, {:6.2})", p.x, p.y);
                    }
                })
            })
            .run_if(render)
            .before("quit"),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tessera_engine::logging::init("info");

    let mut builder = CatalogBuilder::new();
    builder
        .plugin(&SimulationPlugin)?
        .plugin(&TextRenderPlugin)?;
    let catalog = builder.build().context("building catalog")?;
    info!(fingerprint = %catalog.graph().fingerprint()?, "schedule committed");

    let tags = if std::env::args().any(|a| a == "--render") {
        vec!["render".to_owned()]
    } else {
        Vec::new()
    };
    let world = World::from_config(catalog, &WorldConfig { tags })?;

    let mut runner = Runner::new(world, RunConfig::default())?;
    let frames = runner.run_frames(10_000, 1.0 / 60.0);
    info!(
        frames,
        ticks = runner.tick_count(),
        sim_time = runner.sim_time(),
        "world stopped"
    );
    Ok(())
}
