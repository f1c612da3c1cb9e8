use anyhow::{Context, Result};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState, Region},
    delegate_compositor, delegate_layer, delegate_output, delegate_registry, delegate_shm,
    output::{OutputHandler, OutputState},
    reexports::{
        calloop::{channel, EventLoop},
        calloop_wayland_source::WaylandSource,
    },
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    shell::{
        wlr_layer::{
            Anchor, Layer, LayerShell, LayerShellHandler, LayerSurface, LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use std::str::FromStr;
use tiny_skia::{Color, Pixmap, PixmapMut, PixmapPaint, Transform};
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_output, wl_shm, wl_surface},
    Connection, QueueHandle,
};

use crate::clock::{Clock, DisplaySurface, LocalTime};
use crate::config::UPDATE_INTERVAL;
use crate::notify;
use crate::render::SvgRenderer;
use crate::settings::{FileStore, Settings};
use crate::timer::Ticker;
use crate::types::PanelConstraint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl PanelCorner {
    fn anchor(self) -> Anchor {
        match self {
            PanelCorner::TopLeft => Anchor::TOP | Anchor::LEFT,
            PanelCorner::TopRight => Anchor::TOP | Anchor::RIGHT,
            PanelCorner::BottomLeft => Anchor::BOTTOM | Anchor::LEFT,
            PanelCorner::BottomRight => Anchor::BOTTOM | Anchor::RIGHT,
        }
    }
}

impl FromStr for PanelCorner {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "top-left" => Ok(PanelCorner::TopLeft),
            "top-right" => Ok(PanelCorner::TopRight),
            "bottom-left" => Ok(PanelCorner::BottomLeft),
            "bottom-right" => Ok(PanelCorner::BottomRight),
            _ => Err(anyhow::anyhow!("unknown anchor: {value}")),
        }
    }
}

pub struct AppletOptions {
    pub uuid: String,
    pub panel_size: u32,
    pub corner: PanelCorner,
}

type PanelClock = Clock<FileStore, SvgRenderer, LocalTime>;

pub fn run_applet(options: AppletOptions) -> Result<()> {
    let settings = Settings::new(FileStore::open_default()?);
    let clock = Clock::new(settings, SvgRenderer::default(), LocalTime);

    let conn = Connection::connect_to_env().context("connect to Wayland")?;
    let (globals, event_queue) =
        registry_queue_init::<Applet>(&conn).context("init registry")?;
    let qh = event_queue.handle();

    let mut event_loop: EventLoop<'static, Applet> =
        EventLoop::try_new().context("create event loop")?;
    let loop_handle = event_loop.handle();
    WaylandSource::new(conn.clone(), event_queue)
        .insert(loop_handle.clone())
        .map_err(|err| anyhow::anyhow!("insert wayland source: {}", err.error))?;

    let compositor =
        CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
    let layer_shell = LayerShell::bind(&globals, &qh).context("layer shell not available")?;
    let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;

    let panel_size = options.panel_size;
    let surface = compositor.create_surface(&qh);
    let layer = layer_shell.create_layer_surface(
        &qh,
        surface,
        Layer::Top,
        Some(options.uuid.clone()),
        None,
    );
    layer.set_anchor(options.corner.anchor());
    layer.set_size(panel_size, panel_size);
    // Empty input region: clicks on the surface reach whatever is underneath.
    let input = Region::new(&compositor).context("create input region")?;
    layer.wl_surface().set_input_region(Some(input.wl_region()));
    layer.commit();

    let pool = SlotPool::new((panel_size * panel_size * 4) as usize, &shm)
        .context("create shm pool")?;

    let (notify_tx, notify_rx) = channel::channel::<()>();
    let _listener = notify::listen(&notify::runtime_socket_path(), move || {
        let _ = notify_tx.send(());
    })?;
    loop_handle
        .insert_source(notify_rx, |event, _, app: &mut Applet| {
            if let channel::Event::Msg(()) = event {
                app.settings_changed();
            }
        })
        .map_err(|err| anyhow::anyhow!("insert notify source: {}", err.error))?;

    let mut app = Applet {
        registry_state: RegistryState::new(&globals),
        output_state: OutputState::new(&globals, &qh),
        shm,
        surface: LayerFrame {
            layer,
            pool,
            width: panel_size,
            height: panel_size,
            buffer_scale: 1,
            configured: false,
        },
        clock,
        ticker: Ticker::new(loop_handle, UPDATE_INTERVAL),
        panel_size: None,
        exit: false,
    };
    app.ticker.start(Applet::tick)?;
    log::info!(
        "{} started: {}px clock, polling every {}s",
        options.uuid,
        app.clock.config().size,
        UPDATE_INTERVAL.as_secs()
    );

    while !app.exit {
        event_loop
            .dispatch(None, &mut app)
            .context("dispatch events")?;
    }
    app.ticker.stop();
    Ok(())
}

struct Applet {
    registry_state: RegistryState,
    output_state: OutputState,
    shm: Shm,
    surface: LayerFrame,
    clock: PanelClock,
    ticker: Ticker<Applet>,
    panel_size: Option<u32>,
    exit: bool,
}

impl Applet {
    fn tick(&mut self) {
        if !self.surface.configured {
            return;
        }
        if let Err(err) = self.clock.update_time(&mut self.surface) {
            log::error!("clock update failed: {err:#}");
        }
    }

    fn settings_changed(&mut self) {
        self.clock.settings_changed();
        self.tick();
    }

    fn panel_resized(&mut self, panel_size: u32) {
        if self.panel_size == Some(panel_size) {
            return;
        }
        self.panel_size = Some(panel_size);
        self.clock
            .panel_resized(PanelConstraint::from_panel_size(panel_size));
    }
}

/// The layer surface as the clock's display: frames are centered on a
/// transparent buffer the size of the surface.
struct LayerFrame {
    layer: LayerSurface,
    pool: SlotPool,
    width: u32,
    height: u32,
    buffer_scale: u32,
    configured: bool,
}

impl DisplaySurface for LayerFrame {
    fn scale(&self) -> u32 {
        self.buffer_scale
    }

    fn present(&mut self, frame: &Pixmap) -> Result<()> {
        let buffer_width = self.width * self.buffer_scale;
        let buffer_height = self.height * self.buffer_scale;
        let stride = buffer_width as i32 * 4;

        let needed = (buffer_width * buffer_height * 4) as usize;
        if self.pool.len() < needed {
            self.pool.resize(needed).context("resize shm pool")?;
        }

        let (buffer, canvas) = self
            .pool
            .create_buffer(
                buffer_width as i32,
                buffer_height as i32,
                stride,
                wl_shm::Format::Argb8888,
            )
            .context("create buffer")?;

        {
            let mut pixmap = PixmapMut::from_bytes(canvas, buffer_width, buffer_height)
                .context("pixmap from buffer")?;
            pixmap.fill(Color::from_rgba8(0, 0, 0, 0));

            // Frames arrive at buffer density, so they are placed pixel for pixel.
            let (x, y) = frame_origin(buffer_width, buffer_height, frame);
            pixmap.draw_pixmap(
                x,
                y,
                frame.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }

        swizzle_rgba_to_bgra(canvas);

        let surface = self.layer.wl_surface();
        surface.damage_buffer(0, 0, buffer_width as i32, buffer_height as i32);
        buffer.attach_to(surface).context("attach buffer")?;
        self.layer.commit();
        Ok(())
    }
}

impl CompositorHandler for Applet {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        new_factor: i32,
    ) {
        let scale = new_factor.max(1) as u32;
        if scale != self.surface.buffer_scale {
            self.surface.buffer_scale = scale;
            self.surface.layer.wl_surface().set_buffer_scale(scale as i32);
            self.clock.invalidate();
            self.tick();
        }
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for Applet {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
}

impl LayerShellHandler for Applet {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        self.ticker.stop();
        self.exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let (width, height) = configure.new_size;
        if width > 0 {
            self.surface.width = width;
        }
        if height > 0 {
            self.surface.height = height;
        }
        self.surface.configured = true;
        self.panel_resized(self.surface.width.min(self.surface.height));
        self.tick();
    }
}

impl ShmHandler for Applet {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

delegate_compositor!(Applet);
delegate_output!(Applet);
delegate_shm!(Applet);
delegate_layer!(Applet);
delegate_registry!(Applet);

impl ProvidesRegistryState for Applet {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState];
}

/// Top-left corner that centers `frame` on a `width`×`height` buffer.
fn frame_origin(width: u32, height: u32, frame: &Pixmap) -> (i32, i32) {
    (
        (width as i32 - frame.width() as i32) / 2,
        (height as i32 - frame.height() as i32) / 2,
    )
}

fn swizzle_rgba_to_bgra(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}
