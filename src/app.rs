//! App: terminal setup, the frame loop, and mouse/key handling.

use crate::Args;
use crate::ui::{self, Projection, ToastEffects, View};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::DefaultTerminal;
use stacktui::anim::{Animator, InstantAnimator, TweenAnimator};
use stacktui::block::{BlockId, BlockState, BlockStore, SharedBlocks};
use stacktui::config::{GameConfig, check_world};
use stacktui::controller::{ControllerDeps, GameController};
use stacktui::geometry::{Layout, Vec2};
use stacktui::input::{Action, InputDispatcher, InputEvent, key_to_action};
use stacktui::notify::NotificationQueue;
use stacktui::theme::Theme;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// World units the tray moves per arrow key press.
const KEY_SCROLL: f32 = 1.0;

/// One game from (re)start to restart or quit.
struct Session {
    blocks: SharedBlocks,
    animator: Rc<dyn Animator>,
    notifications: Rc<RefCell<NotificationQueue>>,
    controller: Rc<GameController>,
    populate: JoinHandle<()>,
    started: Instant,
}

impl Session {
    fn start(config: &GameConfig, layout: Layout, animated: bool, dispatcher: &InputDispatcher) -> Self {
        let blocks = BlockStore::shared();
        let animator: Rc<dyn Animator> = if animated {
            Rc::new(TweenAnimator::new(blocks.clone(), config.animation.clone()))
        } else {
            Rc::new(InstantAnimator::new(blocks.clone()))
        };
        let notifications = Rc::new(RefCell::new(NotificationQueue::new(config.notifications.clone())));
        let controller = Rc::new(GameController::new(ControllerDeps {
            config: config.clone(),
            layout,
            blocks: blocks.clone(),
            animator: animator.clone(),
            notifier: notifications.clone(),
        }));
        controller.activate(dispatcher);
        let populate = {
            let controller = controller.clone();
            tokio::task::spawn_local(async move { controller.populate().await })
        };
        info!(world = ?layout.world, animated, "session started");
        Self {
            blocks,
            animator,
            notifications,
            controller,
            populate,
            started: Instant::now(),
        }
    }

    /// Detach from input and resolve every pending animation so waiting tasks wind down.
    fn stop(&self, dispatcher: &InputDispatcher) {
        self.controller.deactivate(dispatcher);
        self.populate.abort();
        self.animator.cancel_all();
    }
}

/// What the pointer is holding.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Grab {
    Nothing,
    Block { id: BlockId, offset: Vec2 },
    Tray { last_x: f32 },
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    world: Vec2,
    dispatcher: InputDispatcher,
    session: Option<Session>,
    grab: Grab,
    effects: ToastEffects,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        Self {
            args,
            config,
            theme,
            world: Vec2::ZERO,
            dispatcher: InputDispatcher::new(),
            session: None,
            grab: Grab::Nothing,
            effects: ToastEffects::new(),
        }
    }

    /// World size for the current terminal, clamped by `--width`/`--height`.
    fn fit_world(&self) -> Result<Vec2> {
        let (cols, rows) = crossterm::terminal::size()?;
        let fit = ui::world_fit(cols, rows);
        let world = Vec2::new(
            self.args.width.map_or(fit.x, |w| w.min(fit.x)),
            self.args.height.map_or(fit.y, |h| h.min(fit.y)),
        );
        check_world(world.x, world.y).context("terminal too small for the play field")?;
        Ok(world)
    }

    fn restart(&mut self) -> Result<()> {
        if let Some(old) = self.session.take() {
            old.stop(&self.dispatcher);
        }
        self.world = self.fit_world()?;
        self.grab = Grab::Nothing;
        self.effects.clear();
        let layout = Layout::for_world(self.world.x, self.world.y);
        self.session = Some(Session::start(
            &self.config,
            layout,
            !self.args.no_animation,
            &self.dispatcher,
        ));
        Ok(())
    }

    pub async fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        // Fail on a small terminal before touching it.
        self.fit_world()?;

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal).await;

        if let Some(session) = self.session.take() {
            session.stop(&self.dispatcher);
        }
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    async fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.restart()?;
        let frame = self.config.frame_duration();
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.saturating_duration_since(last);
            last = now;

            let Some(session) = self.session.as_ref() else {
                return Ok(());
            };
            session.animator.advance(dt);
            session.notifications.borrow_mut().tick(dt);

            {
                let queue = session.notifications.borrow();
                let view = View {
                    theme: &self.theme,
                    controller: &session.controller,
                    notifications: &queue,
                    world: self.world,
                    animated: !self.args.no_animation,
                    elapsed_secs: session.started.elapsed().as_secs(),
                };
                let effects = &mut self.effects;
                terminal.draw(|f| ui::draw(f, &view, effects, dt))?;
            }

            let area = terminal.get_frame().area();
            let projection = ui::projection(area, self.world);
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => match key_to_action(key) {
                        Action::Quit => return Ok(()),
                        Action::Restart => {
                            info!("restart");
                            self.restart()?;
                        }
                        Action::ScrollLeft => self.scroll(KEY_SCROLL),
                        Action::ScrollRight => self.scroll(-KEY_SCROLL),
                        Action::None => {}
                    },
                    Event::Mouse(mouse) => self.on_mouse(mouse, projection),
                    _ => {}
                }
            }

            // Lets released drops and cascades run between frames.
            tokio::time::sleep(frame.saturating_sub(now.elapsed())).await;
        }
    }

    fn scroll(&self, dx: f32) {
        if let Some(session) = &self.session {
            session.controller.scroll_tray(dx);
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent, projection: Projection) {
        let Some(session) = &self.session else {
            return;
        };
        let point = projection.to_world(mouse.column, mouse.row);
        let controller = &session.controller;
        match (mouse.kind, self.grab) {
            (MouseEventKind::Down(MouseButton::Left), Grab::Nothing) => {
                let picked = session.blocks.borrow().pick_at(point);
                if let Some(id) = picked {
                    self.dispatcher.dispatch(InputEvent::PickUp(id));
                    let held = session.blocks.borrow().get(id).map(|b| (b.state, b.position));
                    if let Some((BlockState::Dragging, position)) = held {
                        self.grab = Grab::Block {
                            id,
                            offset: position - point,
                        };
                    }
                } else if controller.layout().tray_band.contains(point) {
                    self.grab = Grab::Tray { last_x: point.x };
                }
            }
            (MouseEventKind::Drag(MouseButton::Left), Grab::Block { id, offset }) => {
                controller.drag_to(id, point + offset);
            }
            (MouseEventKind::Drag(MouseButton::Left), Grab::Tray { last_x }) => {
                controller.scroll_tray(point.x - last_x);
                self.grab = Grab::Tray { last_x: point.x };
            }
            (MouseEventKind::Up(MouseButton::Left), Grab::Block { id, .. }) => {
                debug!(block = %id, ?point, "pointer released");
                self.dispatcher.dispatch(InputEvent::Release(id));
                self.grab = Grab::Nothing;
            }
            (MouseEventKind::Up(_), _) => self.grab = Grab::Nothing,
            _ => {}
        }
    }
}
