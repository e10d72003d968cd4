//! Terminal back-end.
//!
//! Owns a virtual-node tree ([`TermNode`]), a taffy-backed layout bridge,
//! a frame buffer, and a differential output pipeline. The render path is
//! derived-based, mirroring the reactive core it sits on:
//!
//! ```text
//! node tree -> tree version signal -> frame derived -> render effect
//! ```
//!
//! Tree mutations bump a version signal; a derived recomputes layout and
//! paints a frame (its equality short-circuit absorbs no-op frames); one
//! render effect hands the frame to the event loop, which diffs it to
//! stdout at most once per frame budget.

pub mod buffer;
pub mod layout;
pub mod node;
pub mod output;
pub mod paint;
pub mod style;

pub use buffer::{FrameBuffer, TermCell};
pub use node::TermNode;
pub use output::DiffRenderer;
pub use style::{BorderKind, CrossAlign, Dim, FlexDir, MainAlign, Rgba, StyleProps, TextAttr};

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::tty::IsTty;
use crossterm::{event, terminal};

use crate::error::RenderError;
use crate::render::platform::PlatformNode;
use crate::render::{render, AttrValue, Content};
use crate::signals::{derived, effect, signal, Signal};

// =============================================================================
// Dirty tracking
// =============================================================================

thread_local! {
    static DIRTY: Cell<bool> = const { Cell::new(false) };
    static TREE_VERSION: RefCell<Option<Signal<u64>>> = const { RefCell::new(None) };
}

/// Record that the node tree changed. While a render loop is active this
/// bumps its version signal, waking the frame derived; otherwise it only
/// sets a flag (tests poll it with [`take_dirty`]).
pub(crate) fn mark_dirty() {
    DIRTY.with(|dirty| dirty.set(true));
    let version = TREE_VERSION.with(|slot| slot.borrow().clone());
    if let Some(version) = version {
        version.update(|v| v + 1);
    }
}

/// Read and clear the dirty flag. Host integrations driving their own
/// loop (instead of [`render_terminal`]) poll this between frames.
pub fn take_dirty() -> bool {
    DIRTY.with(|dirty| dirty.replace(false))
}

fn install_version(version: Signal<u64>) {
    TREE_VERSION.with(|slot| *slot.borrow_mut() = Some(version));
}

fn clear_version() {
    TREE_VERSION.with(|slot| *slot.borrow_mut() = None);
}

// =============================================================================
// Terminal loop
// =============================================================================

/// Options for [`render_terminal`].
#[derive(Debug, Clone)]
pub struct TerminalOptions {
    /// Upper bound on frames per second.
    pub fps: u32,
    /// Use the alternate screen.
    pub fullscreen: bool,
    /// Extra quit key (Esc and Ctrl-C always quit).
    pub quit_key: Option<char>,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            fullscreen: true,
            quit_key: Some('q'),
        }
    }
}

fn key_name(code: KeyCode) -> Option<String> {
    match code {
        KeyCode::Char(c) => Some(c.to_string()),
        KeyCode::Enter => Some("enter".to_string()),
        KeyCode::Esc => Some("escape".to_string()),
        KeyCode::Backspace => Some("backspace".to_string()),
        KeyCode::Tab => Some("tab".to_string()),
        KeyCode::Up => Some("up".to_string()),
        KeyCode::Down => Some("down".to_string()),
        KeyCode::Left => Some("left".to_string()),
        KeyCode::Right => Some("right".to_string()),
        _ => None,
    }
}

/// Mount `factory` and drive the terminal until a quit key arrives.
///
/// Fails with [`RenderError::PlatformUnavailable`] when stdout is not a
/// terminal. Restores the screen and raw mode on the way out, also when
/// the loop ends with an error.
pub fn render_terminal<C, F>(factory: F, options: TerminalOptions) -> Result<(), RenderError>
where
    C: Into<Content<TermNode>>,
    F: FnOnce() -> C + 'static,
{
    let mut stdout = io::stdout();
    if !stdout.is_tty() {
        return Err(RenderError::PlatformUnavailable);
    }

    let (width, height) = terminal::size()?;
    let size = signal((width, height));
    let version = signal(0_u64);
    install_version(version.clone());

    terminal::enable_raw_mode()?;
    if options.fullscreen {
        output::enter_fullscreen(&mut stdout)?;
    }

    let root = TermNode::create_container("root");
    let handle = render(factory, &root);

    // Frame derived: layout + paint. Equal frames short-circuit, so
    // version bumps that change nothing stop here.
    let frame = {
        let root = root.clone();
        let size = size.clone();
        derived(move || {
            let _ = version.get();
            let (width, height) = size.get();
            match layout::compute_layout(&root, width, height) {
                Some(tree) => paint::paint(&tree, width, height),
                None => FrameBuffer::new(width, height),
            }
        })
    };

    // The one render effect: publish the latest frame for the loop.
    let pending: Rc<RefCell<Option<FrameBuffer>>> = Rc::new(RefCell::new(None));
    let publish = pending.clone();
    let render_effect = effect(move || {
        *publish.borrow_mut() = Some(frame.get());
    });

    let mut renderer = DiffRenderer::new();
    let frame_budget = Duration::from_millis(1000 / options.fps.max(1) as u64);

    let outcome = (|| -> Result<(), RenderError> {
        loop {
            // At most one draw per budget tick.
            let next = pending.borrow_mut().take();
            if let Some(buffer) = next {
                renderer.render(&mut stdout, &buffer)?;
            }

            if !event::poll(frame_budget)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let quit = key.code == KeyCode::Esc
                        || (key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL))
                        || matches!(
                            (key.code, options.quit_key),
                            (KeyCode::Char(c), Some(quit)) if c == quit
                        );
                    if quit {
                        return Ok(());
                    }
                    if let Some(name) = key_name(key.code) {
                        root.broadcast("key", AttrValue::Text(name));
                    }
                }
                Event::Resize(new_width, new_height) => {
                    size.set((new_width, new_height));
                    renderer.invalidate();
                }
                _ => {}
            }
        }
    })();

    render_effect.dispose();
    handle.dispose();
    clear_version();
    if options.fullscreen {
        let _ = output::exit_fullscreen(&mut stdout);
    }
    let _ = terminal::disable_raw_mode();

    outcome
}
