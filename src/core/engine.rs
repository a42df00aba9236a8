//! Engine context, frame loop and the windowed runner
//!
//! `EngineContext` owns everything that lives across frames: subsystems,
//! the current and shared scenes, the engine state and the event queue.
//! `tick` advances all of it by one frame and can be driven without a
//! window. `Engine` wraps a context in a winit event loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use super::debug::DebugInfo;
use super::events::{EngineEvent, EventQueue};
use super::files::{FileError, FileLoader};
use super::handler::{CommandError, CommandHandler};
use super::message::{Arguments, Filter, Message, MessageResult};
use super::settings::SettingManager;
use super::subsystem::{self, FrameContext, Subsystem};
use super::time::Time;
use crate::input::Input;
use crate::resources::ResourceManager;
use crate::scene::Scene;

/// ID of the scene that lives as long as the engine
pub const SHARED_SCENE_ID: &str = "sharedscene";

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Directory of the setting documents
    pub settings_dir: PathBuf,
    /// Resource search directories, in order
    pub resource_dirs: Vec<PathBuf>,
    /// Writable per-user directory
    pub user_dir: PathBuf,
    /// Length of one physics step in seconds
    pub fixed_timestep: f32,
    /// Upper bound on physics steps per frame
    pub max_fixed_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Jopnal"),
            width: 1280,
            height: 720,
            settings_dir: PathBuf::from("config"),
            resource_dirs: vec![PathBuf::from("resources")],
            user_dir: PathBuf::from("user"),
            fixed_timestep: 1.0 / 60.0,
            max_fixed_steps: 5,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings_dir = dir.into();
        self
    }

    /// Add a resource search directory after the existing ones
    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dirs.push(dir.into());
        self
    }

    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = dir.into();
        self
    }

    /// Set the physics step length. Non-positive values are ignored.
    pub fn with_fixed_timestep(mut self, step: f32) -> Self {
        if step > 0.0 {
            self.fixed_timestep = step;
        }
        self
    }

    pub fn with_max_fixed_steps(mut self, steps: u32) -> Self {
        self.max_fixed_steps = steps;
        self
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FileError::io(path, e))?;
        ron::from_str(&content).map_err(|e| FileError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save the configuration as RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), FileError> {
        let path = path.as_ref();
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| FileError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        fs::write(path, content).map_err(|e| FileError::io(path, e))
    }

    fn file_loader(&self) -> FileLoader {
        let mut files = FileLoader::new(&self.user_dir);
        for dir in &self.resource_dirs {
            files.add_resource_dir(dir);
        }
        files
    }
}

// ============================================================================
// State
// ============================================================================

/// What the frame loop runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Everything updates
    Running,
    /// Scenes update with a zero delta
    ZeroDelta,
    /// Scenes do not update
    RenderOnly,
    /// Nothing but subsystems runs
    Frozen,
}

impl EngineState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::ZeroDelta => "zerodelta",
            Self::RenderOnly => "renderonly",
            Self::Frozen => "frozen",
        }
    }

    /// Parse a state name, ignoring case
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Running, Self::ZeroDelta, Self::RenderOnly, Self::Frozen]
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(name))
    }

    /// Whether scenes update in this state
    #[must_use]
    pub const fn updates_scenes(self) -> bool {
        matches!(self, Self::Running | Self::ZeroDelta)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Map `engine/Debug|Console|uVerbosity` onto a log level
fn level_filter(verbosity: u32) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

// ============================================================================
// Engine context
// ============================================================================

type Hook = fn(&mut dyn Subsystem, &mut FrameContext<'_>);

/// Everything the engine owns, driven one frame at a time by `tick`
pub struct EngineContext {
    /// Wall-clock timing, updated by the windowed runner
    pub time: Time,
    /// Input state
    pub input: Input,
    /// Frame statistics
    pub debug: DebugInfo,
    /// Events from the previous frame
    pub events: EventQueue,
    config: EngineConfig,
    subsystems: Vec<Box<dyn Subsystem>>,
    scene: Option<Scene>,
    shared_scene: Scene,
    state: EngineState,
    exiting: bool,
    advance_frame: bool,
    delta_scale: f32,
    total_time: f64,
    accumulator: f32,
    log_level: log::LevelFilter,
    window_size: PhysicalSize<u32>,
}

impl EngineContext {
    /// Create a context with the default subsystems: a setting manager and a
    /// resource manager over the configured directories
    pub fn new(config: EngineConfig) -> Self {
        let mut settings = SettingManager::new(&config.settings_dir);
        let log_level = level_filter(settings.get("engine/Debug|Console|uVerbosity", 3_u32));
        log::set_max_level(log_level);

        let resources = ResourceManager::new(config.file_loader());
        let window_size = PhysicalSize::new(config.width, config.height);

        let mut ctx = Self {
            time: Time::new(),
            input: Input::new(),
            debug: DebugInfo::new(),
            events: EventQueue::new(),
            config,
            subsystems: Vec::new(),
            scene: None,
            shared_scene: Scene::new(SHARED_SCENE_ID),
            state: EngineState::Running,
            exiting: false,
            advance_frame: false,
            delta_scale: 1.0,
            total_time: 0.0,
            accumulator: 0.0,
            log_level,
            window_size,
        };
        ctx.create_subsystem(settings);
        ctx.create_subsystem(resources);
        ctx
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Log level chosen by the verbosity setting
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
    }

    // ------------------------------------------------------------------------
    // Subsystems
    // ------------------------------------------------------------------------

    /// Add a subsystem after the existing ones
    pub fn create_subsystem<S: Subsystem>(&mut self, subsystem: S) -> &mut S {
        log::info!("Subsystem \"{}\" added", subsystem.id());
        self.subsystems.push(Box::new(subsystem));
        match self
            .subsystems
            .last_mut()
            .and_then(|s| s.as_any_mut().downcast_mut::<S>())
        {
            Some(subsystem) => subsystem,
            None => unreachable!("subsystem was just pushed"),
        }
    }

    /// First subsystem of type `S`
    #[must_use]
    pub fn subsystem<S: Subsystem>(&self) -> Option<&S> {
        self.subsystems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<S>())
    }

    pub fn subsystem_mut<S: Subsystem>(&mut self) -> Option<&mut S> {
        self.subsystems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<S>())
    }

    #[must_use]
    pub fn subsystem_by_id(&self, id: &str) -> Option<&dyn Subsystem> {
        self.subsystems
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
    }

    pub fn subsystem_by_id_mut(&mut self, id: &str) -> Option<&mut dyn Subsystem> {
        match self.subsystems.iter_mut().find(|s| s.id() == id) {
            Some(s) => Some(s.as_mut()),
            None => None,
        }
    }

    /// Remove the first subsystem with this ID
    pub fn remove_subsystem(&mut self, id: &str) -> bool {
        let Some(index) = self.subsystems.iter().position(|s| s.id() == id) else {
            return false;
        };
        self.subsystems.remove(index);
        log::info!("Subsystem \"{id}\" removed");
        self.events.push(EngineEvent::SubsystemRemoved { id: id.to_string() });
        true
    }

    #[must_use]
    pub fn subsystem_count(&self) -> usize {
        self.subsystems.len()
    }

    #[must_use]
    pub fn settings(&self) -> Option<&SettingManager> {
        self.subsystem()
    }

    pub fn settings_mut(&mut self) -> Option<&mut SettingManager> {
        self.subsystem_mut()
    }

    #[must_use]
    pub fn resources(&self) -> Option<&ResourceManager> {
        self.subsystem()
    }

    pub fn resources_mut(&mut self) -> Option<&mut ResourceManager> {
        self.subsystem_mut()
    }

    // ------------------------------------------------------------------------
    // Scenes
    // ------------------------------------------------------------------------

    /// Make `scene` current, returning the previous one
    pub fn set_scene(&mut self, scene: Scene) -> Option<Scene> {
        log::info!("Scene \"{}\" set as current", scene.id());
        self.events.push(EngineEvent::SceneChanged {
            scene: scene.id().to_string(),
        });
        self.scene.replace(scene)
    }

    pub fn take_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    #[must_use]
    pub fn current_scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    #[must_use]
    pub fn has_current_scene(&self) -> bool {
        self.scene.is_some()
    }

    #[must_use]
    pub fn shared_scene(&self) -> &Scene {
        &self.shared_scene
    }

    pub fn shared_scene_mut(&mut self) -> &mut Scene {
        &mut self.shared_scene
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// The engine state. Always `Frozen` once exiting.
    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.exiting {
            EngineState::Frozen
        } else {
            self.state
        }
    }

    pub fn set_state(&mut self, state: EngineState) {
        if self.exiting || self.state == state {
            return;
        }
        log::info!("Engine state changed: {state}");
        self.state = state;
        self.events.push(EngineEvent::StateChanged { state });
    }

    /// Request shutdown. The runner stops after the current frame.
    pub fn exit(&mut self) {
        if !self.exiting {
            log::info!("Exit signal received, exiting...");
            self.exiting = true;
        }
    }

    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Run scene updates for one frame even when the state would skip them
    pub fn advance_frame(&mut self) {
        if !self.exiting {
            self.advance_frame = true;
        }
    }

    pub fn set_delta_scale(&mut self, scale: f32) {
        self.delta_scale = scale;
    }

    #[must_use]
    pub fn delta_scale(&self) -> f32 {
        self.delta_scale
    }

    /// Unscaled time fed to `tick` so far, in seconds
    #[must_use]
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.window_size.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.window_size.height
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.window_size.width as f32 / self.window_size.height.max(1) as f32
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    fn run_hooks(&mut self, delta: f32, hook: Hook) {
        let mut ctx = FrameContext {
            delta,
            scene: self.scene.as_mut(),
            shared_scene: &mut self.shared_scene,
            events: &mut self.events,
        };
        for subsystem in self.subsystems.iter_mut().filter(|s| s.is_active()) {
            hook(subsystem.as_mut(), &mut ctx);
        }
    }

    /// Returns the number of steps run
    fn run_fixed_steps(&mut self, delta: f32) -> u32 {
        let step = self.config.fixed_timestep;
        if step <= 0.0 {
            return 0;
        }

        self.accumulator += delta;
        let mut steps = 0;
        while self.accumulator >= step && steps < self.config.max_fixed_steps {
            self.run_hooks(step, |s, ctx| s.pre_fixed_update(ctx));
            if let Some(scene) = &mut self.scene {
                scene.fixed_update(step);
            }
            self.shared_scene.fixed_update(step);
            self.run_hooks(step, |s, ctx| s.post_fixed_update(ctx));

            self.accumulator -= step;
            steps += 1;
        }

        // Too far behind, drop the backlog
        if self.accumulator >= step {
            log::trace!("Dropping {:.3}s of physics time", self.accumulator);
            self.accumulator = 0.0;
        }
        steps
    }

    /// Advance everything by one frame of `frame_time` seconds
    pub fn tick(&mut self, frame_time: f32) {
        let frame_time = frame_time.max(0.0);
        self.total_time += f64::from(frame_time);

        let advancing = self.advance_frame;
        let state = self.state();
        let delta = if state == EngineState::ZeroDelta && !advancing {
            0.0
        } else {
            frame_time * self.delta_scale
        };

        self.events.swap();
        self.run_hooks(delta, |s, ctx| s.pre_update(ctx));

        let mut fixed_steps = 0;
        if state.updates_scenes() || advancing {
            fixed_steps = self.run_fixed_steps(delta);

            if let Some(scene) = &mut self.scene {
                scene.update(delta);
                self.events.extend(scene.drain_events());
            }
            self.shared_scene.update(delta);
            self.events.extend(self.shared_scene.drain_events());
        }

        self.run_hooks(delta, |s, ctx| s.post_update(ctx));
        self.advance_frame = false;

        for subsystem in self.subsystems.iter_mut().filter(|s| s.is_active()) {
            subsystem.draw();
        }

        let frame = Duration::try_from_secs_f32(frame_time).unwrap_or_default();
        self.debug.record_frame(frame, fixed_steps);
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Parse and route a message
    pub fn send_message_str(&mut self, text: &str) -> MessageResult {
        self.send_message(&Message::new(text))
    }

    /// Route a message: engine commands, the shared scene, the current
    /// scene, then subsystems. Stops at the first `Escape`.
    pub fn send_message(&mut self, message: &Message) -> MessageResult {
        if message.pass_filter(Filter::ENGINE | Filter::COMMAND)
            && engine_commands().dispatch(self, (), message).is_escape()
        {
            return MessageResult::Escape;
        }

        if self
            .shared_scene
            .deliver(message, Filter::SHARED_SCENE)
            .is_escape()
        {
            return MessageResult::Escape;
        }

        if let Some(scene) = &mut self.scene
            && scene.deliver(message, Filter::SCENE).is_escape()
        {
            return MessageResult::Escape;
        }

        for s in &mut self.subsystems {
            if subsystem::deliver(s.as_mut(), message).is_escape() {
                return MessageResult::Escape;
            }
        }
        MessageResult::Continue
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<_> = self.subsystems.iter().map(|s| s.id()).collect();
        f.debug_struct("EngineContext")
            .field("state", &self.state())
            .field("subsystems", &ids)
            .field("scene", &self.scene.as_ref().map(Scene::id))
            .field("delta_scale", &self.delta_scale)
            .field("total_time", &self.total_time)
            .finish()
    }
}

type EngineResult = Result<MessageResult, CommandError>;

fn engine_commands() -> &'static CommandHandler<EngineContext> {
    static COMMANDS: OnceLock<CommandHandler<EngineContext>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler: CommandHandler<EngineContext> = CommandHandler::new();
        handler
            .bind("exit", |ctx, (), _| {
                ctx.exit();
                Ok(MessageResult::Continue)
            })
            .bind("setState", set_state)
            .bind("setDeltaScale", |ctx, (), args| {
                ctx.set_delta_scale(args.next_f32()?);
                Ok(MessageResult::Continue)
            })
            .bind("advanceFrame", |ctx, (), _| {
                ctx.advance_frame();
                Ok(MessageResult::Continue)
            })
            .bind("removeSubsystem", |ctx, (), args| {
                let id = args.next_str()?;
                if ctx.remove_subsystem(id) {
                    Ok(MessageResult::Continue)
                } else {
                    Err(CommandError::NotFound(id.to_string()))
                }
            });
        handler
    })
}

fn set_state(ctx: &mut EngineContext, _: (), args: &mut Arguments<'_>) -> EngineResult {
    let name = args.next_str()?;
    let state = EngineState::from_name(name)
        .ok_or_else(|| CommandError::NotFound(format!("engine state \"{name}\"")))?;
    ctx.set_state(state);
    Ok(MessageResult::Continue)
}

// ============================================================================
// Windowed runner
// ============================================================================

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once when the window exists
    fn init(&mut self, engine: &mut EngineContext);

    /// Called every frame before the engine ticks
    fn update(&mut self, engine: &mut EngineContext);

    /// Called when the window is resized
    fn on_resize(&mut self, _engine: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called when the game is shutting down
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Main engine struct
pub struct Engine<G: Game> {
    game: G,
    context: EngineContext,
    window: Option<Arc<Window>>,
    initialized: bool,
}

impl<G: Game> Engine<G> {
    pub fn new(config: EngineConfig, game: G) -> Self {
        Self {
            game,
            context: EngineContext::new(config),
            window: None,
            initialized: false,
        }
    }

    pub fn context(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    /// Run the engine until the window closes or the context exits
    pub fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::new()
            .filter_level(self.context.log_level())
            .parse_default_env()
            .init();
        log::info!("Starting engine: {}", self.context.config().title);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.game.shutdown(&mut self.context);
        if let Some(settings) = self.context.settings_mut() {
            settings.save();
        }
        event_loop.exit();
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let config = self.context.config();
        let window_attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window);

        if !self.initialized {
            self.game.init(&mut self.context);
            self.initialized = true;
            self.context.time.reset_clock();
            log::info!("Engine initialized successfully");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.context.exit();
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    self.context.window_size = new_size;
                    self.game
                        .on_resize(&mut self.context, new_size.width, new_size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key_code) = event.physical_key {
                    self.context.input.process_keyboard(key_code, event.state);
                }
            }

            WindowEvent::Focused(false) => self.context.input.release_all(),

            WindowEvent::MouseInput { state, button, .. } => {
                self.context.input.process_mouse_button(button, state);
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.context
                    .input
                    .process_mouse_motion(glam::Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => glam::Vec2::new(x, y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        glam::Vec2::new(pos.x as f32, pos.y as f32)
                    }
                };
                self.context.input.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.context.time.update();

                self.game.update(&mut self.context);
                let frame_time = self.context.time.delta_secs();
                self.context.tick(frame_time);

                if self.context.is_exiting() {
                    self.shutdown(event_loop);
                    return;
                }

                // Clear per-frame input state
                self.context.input.update();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
