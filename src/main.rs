//! Editor demo: a small scene driven through the command buffer
//!
//! There is no renderer. The window only collects input; the scene tree is
//! logged with F1.

use jopnal::editor::{
    CommandBuffer, CommandSender, CreateObjectCommand, DEFAULT_MAX_SIZE, RemoveObjectCommand,
    SetActiveCommand,
};
use jopnal::input::{InputAction, InputMapper};
use jopnal::physics::{BodyType, CollisionShape, RigidBodyDesc};
use jopnal::prelude::*;
use jopnal::scene::SceneError;

const CAMERA_SPEED: f32 = 4.0;
const LOOK_SPEED: f32 = 1.5;

struct EditorDemo {
    mapper: InputMapper,
    sender: Option<CommandSender>,
    camera: Option<ObjectKey>,
    selected: Option<ObjectKey>,
    yaw: f32,
    pitch: f32,
}

impl EditorDemo {
    fn new() -> Self {
        Self {
            mapper: InputMapper::with_defaults(),
            sender: None,
            camera: None,
            selected: None,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    fn build_scene(&mut self) -> Result<Scene, SceneError> {
        let mut scene = Scene::new("demo");
        let root = scene.root();

        let ground = scene.create_child(root, "ground")?;
        scene.add_rigid_body(
            ground,
            &CollisionShape::InfinitePlane { normal: Vec3::Y },
            &RigidBodyDesc::new(BodyType::Static),
        )?;

        let crate_box = scene.create_child(root, "box")?;
        scene.set_position(crate_box, Vec3::new(0.0, 5.0, 0.0));
        scene.add_rigid_body(
            crate_box,
            &CollisionShape::Box {
                half_extents: Vec3::splat(0.5),
            },
            &RigidBodyDesc::new(BodyType::Dynamic).with_restitution(0.3),
        )?;

        let arm = scene.create_child(root, "arm")?;
        scene.set_position(arm, Vec3::new(2.0, 1.0, 0.0)).add_tag(arm, "limb");
        let hand = scene.create_child(arm, "hand")?;
        scene.set_position(hand, Vec3::new(0.0, 1.0, 0.0)).add_tag(hand, "limb");

        let camera = scene.create_child(root, "camera")?;
        scene.set_position(camera, Vec3::new(0.0, 2.0, 8.0));

        self.camera = scene.object_key(camera);
        self.selected = scene.object_key(arm);
        Ok(scene)
    }

    fn move_camera(&mut self, ctx: &mut EngineContext) {
        let dt = ctx.time.delta_secs();
        let input = &ctx.input;
        let mapper = &self.mapper;

        self.yaw += mapper.axis(input, InputAction::LookRight, InputAction::LookLeft) * LOOK_SPEED * dt;
        self.pitch = (self.pitch
            + mapper.axis(input, InputAction::LookDown, InputAction::LookUp) * LOOK_SPEED * dt)
            .clamp(-1.4, 1.4);

        let mut speed = CAMERA_SPEED;
        if mapper.action_pressed(input, InputAction::Sprint) {
            speed *= 3.0;
        }
        let local = Vec3::new(
            mapper.axis(input, InputAction::MoveLeft, InputAction::MoveRight),
            mapper.axis(input, InputAction::MoveDown, InputAction::MoveUp),
            mapper.axis(input, InputAction::MoveForward, InputAction::MoveBackward),
        );
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, self.yaw, self.pitch, 0.0);

        let Some(key) = self.camera else {
            return;
        };
        if let Some(scene) = ctx.current_scene_mut()
            && let Some(camera) = scene.entity_by_key(key)
        {
            let position = scene.position(camera) + rotation * local * speed * dt;
            scene.set_rotation(camera, rotation).set_position(camera, position);
        }
    }

    fn edit(&mut self, ctx: &mut EngineContext) {
        let (Some(sender), Some(selected)) = (&self.sender, self.selected) else {
            return;
        };
        let input = &ctx.input;
        let mapper = &self.mapper;

        if mapper.action_just_pressed(input, InputAction::Undo) {
            sender.undo(1);
        }
        if mapper.action_just_pressed(input, InputAction::Redo) {
            sender.redo();
        }
        if mapper.action_just_pressed(input, InputAction::DeleteObject) {
            sender.push(Box::new(RemoveObjectCommand::new(selected)));
        }

        let Some(scene) = ctx.current_scene() else {
            return;
        };
        let Some(entity) = scene.entity_by_key(selected) else {
            return;
        };
        if mapper.action_just_pressed(input, InputAction::DuplicateObject) {
            let id = scene.object_id(entity).unwrap_or_default();
            sender.push(Box::new(CreateObjectCommand::new(Some(selected), format!("{id} child"))));
        }
        if mapper.action_just_pressed(input, InputAction::ToggleActive) {
            sender.push(Box::new(SetActiveCommand::new(selected, !scene.is_active(entity))));
        }
        if mapper.action_just_pressed(input, InputAction::PrintTree) {
            scene.print_debug_tree();
        }
    }
}

impl Game for EditorDemo {
    fn init(&mut self, ctx: &mut EngineContext) {
        log::info!("Initializing editor demo");

        let buffer = match ctx.settings_mut() {
            Some(settings) => CommandBuffer::new(settings),
            None => CommandBuffer::with_max_size(DEFAULT_MAX_SIZE),
        };
        self.sender = Some(ctx.create_subsystem(buffer).sender());

        match self.build_scene() {
            Ok(scene) => {
                ctx.set_scene(scene);
            }
            Err(e) => {
                log::error!("Failed to build the demo scene: {e}");
                ctx.exit();
            }
        }
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        let pressed = |action| self.mapper.action_just_pressed(&ctx.input, action);
        let (quit, pause, step) = (
            pressed(InputAction::Quit),
            pressed(InputAction::Pause),
            pressed(InputAction::StepFrame),
        );

        if quit {
            ctx.exit();
            return;
        }
        if pause {
            let next = match ctx.state() {
                EngineState::ZeroDelta => EngineState::Running,
                _ => EngineState::ZeroDelta,
            };
            ctx.set_state(next);
        }
        if step {
            ctx.advance_frame();
        }

        self.move_camera(ctx);
        self.edit(ctx);

        for event in ctx.events.iter() {
            log::debug!("{event:?}");
        }
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        log::info!("Shutting down after {:.1}s", ctx.total_time());
    }
}

fn main() {
    let config = EngineConfig::load_ron("engine.ron").unwrap_or_else(|_| {
        EngineConfig::default()
            .with_title("jopnal editor demo")
            .with_size(1280, 720)
    });

    let engine = Engine::new(config, EditorDemo::new());
    if let Err(e) = engine.run() {
        eprintln!("Engine error: {e}");
    }
}
