//! Flow control and application event loop.
//!
//! A "flow" is a unit of per-frame behaviour: it handles input, updates its
//! state, and hands renderable objects to the engine each frame.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scenes that handle events and rendering
//! - [`Out<E>`] is the output type for async event handling
//!
//! # Lifecycle
//!
//! The event loop follows this pattern each frame:
//! 1. Forward window events to the orbit controls and to every flow
//! 2. On a redraw request, hand loads that resolved since the last frame to
//!    `on_custom_events`, then call `on_update` on every flow
//! 3. Upload the camera uniform
//! 4. Collect every flow's `on_render()`
//! 5. Render the shadow map, then the lit main pass
//! 6. Present the frame and request the next one

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    camera::Viewport,
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::model::{DrawModel, DrawShadow},
    render::{Instanced, Render},
};

/// `Send` on native, where flow futures run on the tokio worker threads. No bound on WASM,
/// where they stay on the browser's single thread.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

/// A boxed future resolving to a flow event.
#[cfg(not(target_arch = "wasm32"))]
pub type EventFuture<E> = Box<dyn Future<Output = E> + Send>;
#[cfg(target_arch = "wasm32")]
pub type EventFuture<E> = Box<dyn Future<Output = E>>;

///
/// This is the Output Type for every lifecycle hook where the user can pass async events that are
/// handled according to the platform you're running on.
///
/// `Out::FutEvent` spawns each future independently and returns without waiting for any of them.
/// Natively they run on the app's tokio runtime; on WASM each one gets its own `spawn_local`.
/// Results are handed to `on_custom_events` on the event loop thread in the order they resolve,
/// while frames keep rendering in between.
///
/// `Empty` is the default output used when no eventing/futures need to be handled.
///
pub enum Out<E> {
    FutEvent(Vec<EventFuture<E>>),
    Empty,
}

impl<E> Default for Out<E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame before rendering
/// 4. `on_custom_events()` is called when a future returned through [`Out`] resolves
/// 5. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<E>;

    /// Update state every frame.
    ///
    /// Called every frame with the elapsed time `dt` since the previous one. The camera in
    /// `ctx` may be moved here; the engine uploads it afterwards.
    fn on_update(&mut self, ctx: &mut Context, state: &mut S, dt: Duration) -> Out<E>;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. This allows lazy initialization and resource loading.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(Viewport::new(width, height)) {
            self.is_surface_configured = true;
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws: Vec<Instanced> = graphics_flows
            .iter()
            .flat_map(|flow| flow.on_render().into_instanced())
            .filter(|instanced| instanced.amount > 0 && instanced.instance.size() > 0)
            .collect();

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            shadow_pass.set_pipeline(&self.ctx.pipelines.shadow);
            for instanced in draws.iter().filter(|instanced| instanced.casts_shadow) {
                shadow_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                shadow_pass.draw_model_depth(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.ctx.light.shadow_bind_group,
                );
            }
        }
        {
            // With MSAA we draw into the multisampled target and resolve into the frame.
            let (target, resolve_target) = match &self.ctx.msaa_target {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: if resolve_target.is_some() {
                                wgpu::StoreOp::Discard
                            } else {
                                wgpu::StoreOp::Store
                            },
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    ..Default::default()
                });

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in &draws {
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    // Resolved flow futures, drained at the start of every frame.
    #[cfg(not(target_arch = "wasm32"))]
    resolved_tx: tokio::sync::mpsc::UnboundedSender<Event>,
    #[cfg(not(target_arch = "wasm32"))]
    resolved_rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
    #[cfg(target_arch = "wasm32")]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State, Event>>,
    config: SceneConfig,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    last_time: Instant,
    /// Setup failure reported back from `run`.
    error: Option<anyhow::Error>,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: 'static,
{
    #[cfg_attr(not(target_arch = "wasm32"), allow(unused_variables))]
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        config: SceneConfig,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let (resolved_tx, resolved_rx) = tokio::sync::mpsc::unbounded_channel();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            #[cfg(not(target_arch = "wasm32"))]
            resolved_tx,
            #[cfg(not(target_arch = "wasm32"))]
            resolved_rx,
            #[cfg(target_arch = "wasm32")]
            proxy: event_loop.create_proxy(),
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("App initialization failed: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    // Natively resolved futures go through `App::resolved_rx` instead.
    #[allow(dead_code)]
    Custom(Event),
    #[allow(dead_code)]
    Exit,
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

impl<State: 'static + Default, Event: 'static + MaybeSend> App<State, Event> {
    /// Runs `on_init` on every flow once the context exists.
    fn start_flows(&mut self) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        for flow in self.graphics_flows.iter_mut() {
            let events = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                #[cfg(not(target_arch = "wasm32"))]
                &self.resolved_tx,
                #[cfg(target_arch = "wasm32")]
                self.proxy.clone(),
                events,
            );
        }
        app_state.ctx.window.request_redraw();
    }
}

impl<State: 'static + Default, Event: 'static + MaybeSend> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("helipad-scene");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => {
                    self.fail(
                        event_loop,
                        anyhow::anyhow!("no element with id `{CANVAS_ID}` in the page"),
                    );
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("creating the window"));
                return;
            }
        };

        let config = self.config.clone();
        let init_future = async move {
            let app_state = AppState::<State>::new(window, &config).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // The clone in into() leverages the internal Arcs of Device and Queue and thus only clones the ref
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => {
                    self.state = Some(app_state);
                    self.graphics_flows = flows;
                    self.start_flows();
                }
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => {
                        log::error!("App initialization failed: {:#}", e);
                        FlowEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed before initialization finished.");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized { state, flows } => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(state);
                self.graphics_flows = flows;
                self.start_flows();
            }
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    dispatch_custom_event(&mut self.graphics_flows, state, custom_event);
                }
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        // general stuff
        state.ctx.camera.controller.handle_window_events(&event);

        self.graphics_flows.iter_mut().for_each(|f| {
            let events = f.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                #[cfg(not(target_arch = "wasm32"))]
                &self.resolved_tx,
                #[cfg(target_arch = "wasm32")]
                self.proxy.clone(),
                events,
            );
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                #[cfg(not(target_arch = "wasm32"))]
                while let Ok(custom_event) = self.resolved_rx.try_recv() {
                    dispatch_custom_event(&mut self.graphics_flows, state, custom_event);
                }

                self.graphics_flows.iter_mut().for_each(|f| {
                    let events = f.on_update(&mut state.ctx, &mut state.state, dt);
                    handle_flow_output(
                        #[cfg(not(target_arch = "wasm32"))]
                        &self.async_runtime,
                        #[cfg(not(target_arch = "wasm32"))]
                        &self.resolved_tx,
                        #[cfg(target_arch = "wasm32")]
                        self.proxy.clone(),
                        events,
                    );
                });
                state.ctx.write_camera_uniform();

                match state.render(&self.graphics_flows) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn dispatch_custom_event<State, Event>(
    graphics_flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
    state: &mut AppState<State>,
    custom_event: Event,
) {
    let result = graphics_flows
        .iter_mut()
        .fold(Some(custom_event), |event, flow| {
            flow.on_custom_events(&state.ctx, &mut state.state, event?)
        });
    if result.is_some() {
        log::warn!("Warning! Custom event was not consumed this cycle");
    }
}

/// Spawns every future of `out` on the runtime; each result is queued for the
/// next frame as soon as it resolves.
#[cfg(not(target_arch = "wasm32"))]
fn handle_flow_output<Event: Send + 'static>(
    async_runtime: &tokio::runtime::Runtime,
    resolved_tx: &tokio::sync::mpsc::UnboundedSender<Event>,
    out: Out<Event>,
) {
    match out {
        Out::FutEvent(futures) => {
            for fut in futures.into_iter().map(Pin::from) {
                let resolved_tx = resolved_tx.clone();
                async_runtime.spawn(async move {
                    let event = fut.await;
                    if resolved_tx.send(event).is_err() {
                        log::error!("Event loop was closed before all events could be processed.");
                    }
                });
            }
        }
        Out::Empty => (),
    }
}

#[cfg(target_arch = "wasm32")]
fn handle_flow_output<State: 'static, Event: 'static>(
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State, Event>>,
    out: Out<Event>,
) {
    match out {
        // Send the events passed by the user to winit, one by one as they resolve
        Out::FutEvent(futures) => {
            for fut in futures.into_iter().map(Pin::from) {
                let proxy = proxy.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let event = fut.await;
                    if proxy.send_event(FlowEvent::Custom(event)).is_err() {
                        log::error!("Event loop was closed before all events could be processed.");
                    }
                });
            }
        }
        Out::Empty => (),
    }
}

fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }
}

pub fn run<State: 'static + Default, Event: 'static + MaybeSend>(
    config: SceneConfig,
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    init_logging();

    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn flow_output_returns_before_its_futures_resolve() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (resolved_tx, mut resolved_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release, held) = tokio::sync::oneshot::channel::<()>();

        let out: Out<&'static str> = Out::FutEvent(vec![
            Box::new(async move {
                let _ = held.await;
                "sky"
            }) as EventFuture<&'static str>,
            Box::new(async { "car" }),
        ]);
        handle_flow_output(&runtime, &resolved_tx, out);

        // The first load is still pending, the second one overtakes it.
        assert_eq!(runtime.block_on(resolved_rx.recv()), Some("car"));
        assert!(resolved_rx.try_recv().is_err());

        release.send(()).unwrap();
        assert_eq!(runtime.block_on(resolved_rx.recv()), Some("sky"));
    }

    #[test]
    fn empty_output_spawns_nothing() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (resolved_tx, mut resolved_rx) = tokio::sync::mpsc::unbounded_channel::<u8>();
        handle_flow_output(&runtime, &resolved_tx, Out::Empty);
        drop(resolved_tx);
        assert_eq!(runtime.block_on(resolved_rx.recv()), None);
    }
}
