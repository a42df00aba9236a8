//! Text commands understood by scenes and scene objects

use std::sync::OnceLock;

use glam::Vec3;
use hecs::Entity;

use super::Scene;
use crate::core::{Arguments, CommandError, CommandHandler, MessageResult};

type SceneResult = Result<MessageResult, CommandError>;

pub(super) fn scene_commands() -> &'static CommandHandler<Scene> {
    static COMMANDS: OnceLock<CommandHandler<Scene>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler: CommandHandler<Scene> = CommandHandler::new();
        handler
            .bind("setDeltaScale", |scene, (), args| {
                scene.set_delta_scale(args.next_f32()?);
                Ok(MessageResult::Continue)
            })
            .bind("printTree", |scene, (), _| {
                scene.print_debug_tree();
                Ok(MessageResult::Continue)
            });
        handler
    })
}

pub(super) fn object_commands() -> &'static CommandHandler<Scene, Entity> {
    static COMMANDS: OnceLock<CommandHandler<Scene, Entity>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler: CommandHandler<Scene, Entity> = CommandHandler::new();
        handler
            // Transform
            .bind("setPosition", |scene, e, args| {
                scene.set_position(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("setRotation", |scene, e, args| {
                scene.set_rotation_euler(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("setScale", |scene, e, args| {
                scene.set_scale(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("lookAt", |scene, e, args| {
                scene.look_at(e, args.next_vec3()?, Vec3::Y);
                Ok(MessageResult::Continue)
            })
            .bind("move", |scene, e, args| {
                scene.move_by(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("scale", |scene, e, args| {
                scene.scale_by(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("rotate", |scene, e, args| {
                scene.rotate_euler(e, args.next_vec3()?);
                Ok(MessageResult::Continue)
            })
            .bind("setIgnoreParent", |scene, e, args| {
                scene.set_ignore_parent(e, args.next_bool()?);
                Ok(MessageResult::Continue)
            })
            // Tags and identity
            .bind("addTag", |scene, e, args| {
                scene.add_tag(e, args.next_string()?);
                Ok(MessageResult::Continue)
            })
            .bind("removeTag", |scene, e, args| {
                scene.remove_tag(e, args.next_str()?);
                Ok(MessageResult::Continue)
            })
            .bind("clearTags", |scene, e, _| {
                scene.clear_tags(e);
                Ok(MessageResult::Continue)
            })
            .bind("setID", |scene, e, args| {
                scene.set_object_id(e, args.next_string()?);
                Ok(MessageResult::Continue)
            })
            .bind("setActive", |scene, e, args| {
                scene.set_active(e, args.next_bool()?);
                Ok(MessageResult::Continue)
            })
            // Components
            .bind("removeComponents", |scene, e, args| {
                scene.remove_components(e, args.next_u32()?);
                Ok(MessageResult::Continue)
            })
            .bind("clearComponents", |scene, e, _| {
                scene.clear_components(e);
                Ok(MessageResult::Continue)
            })
            // Hierarchy
            .bind("createChild", |scene, e, args| {
                scene.create_child(e, args.next_string()?)?;
                Ok(MessageResult::Continue)
            })
            .bind("adoptChild", adopt_child)
            .bind("setParent", set_parent)
            .bind("cloneChild", |scene, e, args| {
                let id = args.next_str()?;
                let new_id = args.next_string()?;
                scene
                    .clone_child(e, id, new_id)
                    .map(|_| MessageResult::Continue)
                    .ok_or_else(|| CommandError::NotFound(id.to_string()))
            })
            .bind("removeChildren", |scene, e, args| {
                scene.remove_children(e, args.next_str()?);
                Ok(MessageResult::Continue)
            })
            .bind("clearChildren", |scene, e, _| {
                scene.clear_children(e);
                Ok(MessageResult::Continue)
            })
            .bind("removeSelf", |scene, e, _| {
                scene.remove_object(e)?;
                Ok(MessageResult::Continue)
            });
        handler
    })
}

// Re-parenting invalidates the walk over the tree, so both stop delivery

fn adopt_child(scene: &mut Scene, entity: Entity, args: &mut Arguments<'_>) -> SceneResult {
    let path = args.next_str()?;
    let child = scene
        .find_child_with_path(scene.root(), path)
        .ok_or_else(|| CommandError::NotFound(path.to_string()))?;

    scene.adopt_child(entity, child)?;
    Ok(MessageResult::Escape)
}

fn set_parent(scene: &mut Scene, entity: Entity, args: &mut Arguments<'_>) -> SceneResult {
    let path = args.next_str().unwrap_or_default();
    let parent = if path.is_empty() {
        scene.root()
    } else {
        scene
            .find_child_with_path(scene.root(), path)
            .ok_or_else(|| CommandError::NotFound(path.to_string()))?
    };

    scene.set_parent(entity, parent)?;
    Ok(MessageResult::Escape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Message;
    use crate::ecs::ObjectFlags;

    fn scene_with(ids: &[&str]) -> (Scene, Vec<Entity>) {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let entities = ids
            .iter()
            .map(|id| scene.create_child(root, *id).unwrap())
            .collect();
        (scene, entities)
    }

    #[test]
    fn test_all_object_commands_bound() {
        let handler = object_commands();
        for name in [
            "setPosition", "setRotation", "setScale", "lookAt", "move", "scale", "rotate",
            "addTag", "removeTag", "clearTags", "removeComponents", "clearComponents",
            "setActive", "createChild", "adoptChild", "setParent", "cloneChild",
            "removeChildren", "clearChildren", "removeSelf", "setID", "setIgnoreParent",
        ] {
            assert!(handler.is_bound(name), "{name} is not bound");
        }
        assert!(scene_commands().is_bound("printTree"));
    }

    #[test]
    fn test_transform_commands() {
        let (mut scene, objects) = scene_with(&["a"]);
        let a = objects[0];

        scene.send_message_str("[Ob=a] setScale 1 2 3");
        scene.send_message_str("[Ob=a] scale 2 2 2");
        assert_eq!(scene.scale(a), Vec3::new(2.0, 4.0, 6.0));

        scene.send_message_str("[Ob=a] setIgnoreParent true");
        assert!(scene.ignores_parent(a));
    }

    #[test]
    fn test_tag_and_identity_commands() {
        let (mut scene, objects) = scene_with(&["a"]);
        let a = objects[0];

        scene.send_message_str("[Ob=a] addTag enemy");
        assert!(scene.has_tag(a, "enemy"));

        scene.send_message_str("[Ob#enemy] setID boss");
        assert_eq!(scene.object_id(a).as_deref(), Some("boss"));

        scene.send_message_str("[Ob=boss] setActive false");
        assert!(!scene.is_active(a));
    }

    #[test]
    fn test_create_and_clone_child() {
        let (mut scene, objects) = scene_with(&["a"]);
        let a = objects[0];

        scene.send_message_str("[Ob=a] createChild part");
        assert_eq!(scene.child_count(a), 1);

        scene.send_message_str("[Ob=a] cloneChild part part2");
        assert!(scene.find_child(a, "part2", false, true).is_some());
        assert_eq!(scene.child_count(a), 2);
    }

    #[test]
    fn test_adopt_child_escapes() {
        let (mut scene, objects) = scene_with(&["a", "b"]);
        let (a, b) = (objects[0], objects[1]);

        let result = scene.send_message_str("[Ob=a] adoptChild b");
        assert_eq!(result, MessageResult::Escape);
        assert_eq!(scene.parent(b), Some(a));
    }

    #[test]
    fn test_set_parent_empty_path_means_root() {
        let (mut scene, objects) = scene_with(&["a", "b"]);
        let (a, b) = (objects[0], objects[1]);
        let root = scene.root();

        scene.send_message_str("[Ob=b] setParent a");
        assert_eq!(scene.parent(b), Some(a));

        scene.send_message_str("[Ob=b] setParent");
        assert_eq!(scene.parent(b), Some(root));
    }

    #[test]
    fn test_removal_commands() {
        let (mut scene, objects) = scene_with(&["a", "b"]);
        let (a, b) = (objects[0], objects[1]);
        scene.create_child(a, "x").unwrap();
        scene.create_child(a, "y").unwrap();

        scene.send_message_str("[Ob=a] removeChildren x");
        assert_eq!(scene.find_child(a, "x", false, true), None);

        scene.send_message_str("[Ob=a] clearChildren");
        assert_eq!(scene.child_count(a), 0);

        scene.send_message_str("[Ob=b] removeSelf");
        assert!(scene.is_removed(b));
    }

    #[test]
    fn test_bad_arguments_are_reported_not_fatal() {
        let (mut scene, objects) = scene_with(&["a"]);
        let a = objects[0];

        let result = object_commands().execute(&mut scene, a, &Message::new("setPosition 1 two 3"));
        assert!(matches!(result, Err(CommandError::Argument { .. })));

        let result = object_commands().execute(&mut scene, a, &Message::new("adoptChild nowhere"));
        assert_eq!(result, Err(CommandError::NotFound("nowhere".to_string())));

        assert_eq!(scene.send_message_str("[Ob=a] setPosition 1"), MessageResult::Continue);
        assert_eq!(scene.position(a), Vec3::ZERO);
    }

    #[test]
    fn test_root_does_not_remove_itself() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        scene.send_message_str("[Ob=scene] removeSelf");
        assert!(!scene.is_removed(root));
        assert!(!scene.flags(root).contains(ObjectFlags::REMOVED));
    }
}
