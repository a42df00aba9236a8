//! Engine context, command buffer and scene files working together

use jopnal::core::{EngineConfig, EngineContext, EngineEvent};
use jopnal::editor::{
    Command, CommandBuffer, CommandSender, CreateObjectCommand, MAX_SIZE_SETTING,
    RemoveObjectCommand, SetPositionCommand,
};
use jopnal::glam::Vec3;
use jopnal::scene::{ComponentRegistry, Scene};

fn context(dir: &tempfile::TempDir) -> EngineContext {
    let config = EngineConfig::default()
        .with_settings_dir(dir.path().join("config"))
        .with_user_dir(dir.path().join("user"))
        .with_fixed_timestep(0.1);
    EngineContext::new(config)
}

fn add_buffer(ctx: &mut EngineContext) -> CommandSender {
    let settings = ctx.settings_mut().unwrap();
    settings.set(MAX_SIZE_SETTING, 8u32);
    let buffer = CommandBuffer::new(settings);
    ctx.create_subsystem(buffer).sender()
}

#[test]
fn test_queued_commands_run_on_tick() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let sender = add_buffer(&mut ctx);
    assert_eq!(ctx.subsystem::<CommandBuffer>().unwrap().max_size(), 8);

    let mut scene = Scene::new("level");
    let root = scene.root();
    let crate_box = scene.create_child(root, "box").unwrap();
    let key = scene.object_key(crate_box).unwrap();
    ctx.set_scene(scene);

    sender.push(Box::new(SetPositionCommand::new(key, Vec3::new(1.0, 2.0, 3.0))));
    sender.push(Box::new(CreateObjectCommand::new(Some(key), "lid")));
    ctx.tick(0.05);

    let scene = ctx.current_scene().unwrap();
    assert_eq!(scene.position(crate_box), Vec3::new(1.0, 2.0, 3.0));
    assert!(scene.find_child_with_path(scene.root(), "box>lid").is_some());
    assert_eq!(ctx.subsystem::<CommandBuffer>().unwrap().undo_count(), 2);

    ctx.tick(0.05);
    let applied = ctx
        .events
        .iter()
        .filter(|e| matches!(e, EngineEvent::CommandApplied { .. }))
        .count();
    assert_eq!(applied, 2);
}

#[test]
fn test_undo_through_messages() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let sender = add_buffer(&mut ctx);

    let mut scene = Scene::new("level");
    let root = scene.root();
    let arm = scene.create_child(root, "arm").unwrap();
    scene.create_child(arm, "hand").unwrap();
    let key = scene.object_key(arm).unwrap();
    ctx.set_scene(scene);

    sender.push(Box::new(RemoveObjectCommand::new(key)));
    ctx.tick(0.05);
    assert!(ctx.current_scene().unwrap().entity_by_key(key).is_none());

    ctx.send_message_str("[Su=Command Buffer] undo 1");
    ctx.tick(0.05);
    let scene = ctx.current_scene().unwrap();
    let arm = scene.entity_by_key(key).unwrap();
    assert!(scene.find_child(arm, "hand", false, true).is_some());

    ctx.send_message_str("[Su=Command Buffer] redo");
    ctx.tick(0.05);
    assert!(ctx.current_scene().unwrap().entity_by_key(key).is_none());
}

#[test]
fn test_shared_scene_is_edited_without_current_scene() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let sender = add_buffer(&mut ctx);

    sender.push(Box::new(CreateObjectCommand::new(None, "global")));
    ctx.tick(0.05);

    let shared = ctx.shared_scene();
    assert!(shared.find_child(shared.root(), "global", false, true).is_some());
}

#[test]
fn test_edited_scene_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.ron");
    let registry = ComponentRegistry::new();

    let mut scene = Scene::new("level");
    let mut buffer = CommandBuffer::with_max_size(4);
    let mut create = CreateObjectCommand::new(None, "box");
    create.execute(&mut scene).unwrap();
    let key = create.key().unwrap();
    buffer
        .apply(&mut scene, Box::new(SetPositionCommand::new(key, Vec3::X)))
        .unwrap();
    scene.save_ron(&path, &registry).unwrap();

    let loaded = Scene::load_ron(&path, &registry).unwrap();
    let entity = loaded.entity_by_key(key).unwrap();
    assert_eq!(loaded.object_id(entity).as_deref(), Some("box"));
    assert_eq!(loaded.position(entity), Vec3::X);
}
