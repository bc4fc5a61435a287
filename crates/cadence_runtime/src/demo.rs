//! Demo content for the runtime binary: a few components and one system
//! per phase, enough to exercise fan-out, the serial script phase and
//! attach/detach notifications.

use anyhow::Result;
use cadence_core::{
    define_component, system_create, Capabilities, Component, ComponentRef, Engine, EngineContext,
    Entity, Phase, System, SystemDescriptor, SystemRegistrationError, SystemResult,
};
use std::time::Duration;

pub struct Sprite {
    pub frames: u32,
    pub fps: f32,
}
define_component!(Sprite, 1, "Sprite");

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Circle,
}

pub struct Shape {
    pub kind: ShapeKind,
}
define_component!(Shape, 2, "Shape");

pub struct Script {
    pub name: String,
}
define_component!(Script, 3, "Script");

/// Advances every sprite's animation clock.
#[derive(Default)]
struct SpriteAnimator {
    tracked: usize,
    clock: f32,
    frames_shown: u64,
}

impl System for SpriteAnimator {
    fn update(&mut self, ctx: &EngineContext, dt: f32) -> SystemResult {
        self.clock += dt;
        let world = ctx.world();
        for entity in world.entities_with(Sprite::ID) {
            if let Some(sprite) = world.get::<Sprite>(entity) {
                let frame = (self.clock * sprite.fps) as u64 % u64::from(sprite.frames.max(1));
                self.frames_shown += frame + 1;
            }
        }
        Ok(())
    }

    fn accepts(&self, component: &ComponentRef<'_>) -> bool {
        component.is::<Sprite>()
    }

    fn on_component_added(&mut self, _ctx: &EngineContext, _component: &ComponentRef<'_>) {
        self.tracked += 1;
    }

    fn on_component_removed(&mut self, _ctx: &EngineContext, _component: &ComponentRef<'_>) {
        self.tracked = self.tracked.saturating_sub(1);
    }

    fn shutdown(&mut self, _ctx: &EngineContext) {
        tracing::debug!(tracked = self.tracked, frames = self.frames_shown, "sprite animator done");
    }
}

/// Counts shapes per kind, the way a batcher would size its buffers.
#[derive(Default)]
struct ShapeBatcher {
    rects: usize,
    circles: usize,
}

impl System for ShapeBatcher {
    fn update(&mut self, ctx: &EngineContext, _dt: f32) -> SystemResult {
        let world = ctx.world();
        let (mut rects, mut circles) = (0, 0);
        for entity in world.entities_with(Shape::ID) {
            match world.get::<Shape>(entity).map(|shape| shape.kind) {
                Some(ShapeKind::Rect) => rects += 1,
                Some(ShapeKind::Circle) => circles += 1,
                None => {}
            }
        }
        self.rects = rects;
        self.circles = circles;
        Ok(())
    }

    fn accepts(&self, _component: &ComponentRef<'_>) -> bool {
        false
    }

    fn shutdown(&mut self, _ctx: &EngineContext) {
        tracing::debug!(rects = self.rects, circles = self.circles, "shape batcher done");
    }
}

/// State behind the script bridge.
#[derive(Default)]
struct ScriptHost {
    scripts: Vec<(Entity, String)>,
    ticks: u64,
}

fn script_accepts(_host: &ScriptHost, component: &ComponentRef<'_>) -> bool {
    component.is::<Script>()
}

fn script_added(host: &mut ScriptHost, _ctx: &EngineContext, component: &ComponentRef<'_>) {
    if let Some(script) = component.downcast::<Script>() {
        tracing::debug!(entity = %component.entity(), script = %script.name, "script loaded");
        host.scripts.push((component.entity(), script.name.clone()));
    }
}

fn script_removed(host: &mut ScriptHost, _ctx: &EngineContext, component: &ComponentRef<'_>) {
    host.scripts.retain(|(entity, _)| *entity != component.entity());
}

fn script_update(host: &mut ScriptHost, ctx: &EngineContext, _dt: f32) -> SystemResult {
    host.ticks += host.scripts.len() as u64;
    if ctx.time().tick_count() % 60 == 0 {
        tracing::debug!(scripts = host.scripts.len(), ticks = host.ticks, "script host");
    }
    Ok(())
}

/// Periodic frame summary.
struct FrameStats {
    every: u64,
    last_report: Duration,
}

impl System for FrameStats {
    fn update(&mut self, ctx: &EngineContext, _dt: f32) -> SystemResult {
        let time = ctx.time();
        if time.tick_count() % self.every == 0 {
            let span = time.total_time() - self.last_report;
            self.last_report = time.total_time();
            tracing::info!(
                tick = time.tick_count(),
                entities = ctx.world().len(),
                sim_ms = span.as_millis() as u64,
                "frame stats"
            );
        }
        Ok(())
    }

    fn accepts(&self, _component: &ComponentRef<'_>) -> bool {
        false
    }
}

pub fn install(engine: &mut Engine) -> Result<(), SystemRegistrationError> {
    let sprite = Sprite::ID;
    let shape = Shape::ID;

    engine.add_system(
        SystemDescriptor::new("sprite_animator", Phase::Early).reads([sprite]),
        SpriteAnimator::default(),
    )?;
    engine.add_system(
        SystemDescriptor::new("shape_batcher", Phase::Early).reads([shape]),
        ShapeBatcher::default(),
    )?;
    engine.register(system_create(
        "script_bridge",
        Capabilities::new()
            .with_update(script_update)
            .with_accepts(script_accepts)
            .with_on_component_added(script_added)
            .with_on_component_removed(script_removed),
        Phase::Lua,
        ScriptHost::default(),
    ))?;
    engine.add_system(
        SystemDescriptor::new("frame_stats", Phase::Late),
        FrameStats {
            every: 120,
            last_report: Duration::ZERO,
        },
    )?;
    Ok(())
}

/// Spawn `count` entities with a mix of components.
pub fn populate(engine: &mut Engine, count: usize) -> Result<()> {
    for i in 0..count {
        let entity = engine.spawn();
        if i % 2 == 0 {
            engine.attach_component(entity, Sprite { frames: 4, fps: 8.0 })?;
        } else {
            let kind = if i % 4 == 1 {
                ShapeKind::Rect
            } else {
                ShapeKind::Circle
            };
            engine.attach_component(entity, Shape { kind })?;
        }
        if i % 8 == 0 {
            engine.attach_component(
                entity,
                Script {
                    name: format!("npc_{i}.lua"),
                },
            )?;
        }
    }
    Ok(())
}
